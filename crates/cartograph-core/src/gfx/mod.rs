// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The graphics resource and draw-call layer.
//!
//! Everything here is backend-agnostic: traits for the resources a backend
//! creates ([`Context`], [`Texture2D`], [`UniformBuffer`], [`Drawable`]...) and
//! the shared models built on top of them.

pub mod backend;
pub mod buffer;
pub mod command;
pub mod context;
pub mod drawable;
pub mod drawable_builder;
pub mod dynamic_texture;
pub mod dynamic_texture_atlas;
pub mod error;
pub mod image;
pub mod renderable;
pub mod shader;
pub mod shelf_pack;
pub mod state;
pub mod stats;
pub mod texture;
pub mod types;
pub mod uniform_buffer;
pub mod vertex_attribute;

pub use backend::{
    AdapterInfo, AdapterSelection, AdapterSelector, BackendScope, RendererBackend, ScopeState,
    ScopeToken,
};
pub use buffer::{BufferResource, BufferUsage};
pub use command::{CommandEncoder, RenderPass, RenderPassDescriptor, UploadPass};
pub use context::Context;
pub use drawable::{Drawable, DrawableBase, DrawableTweaker, Segment};
pub use drawable_builder::DrawableBuilder;
pub use dynamic_texture::{DynamicTexture, TextureHandle};
pub use dynamic_texture_atlas::{AtlasBatch, DynamicTextureAtlas, ImageRequest};
pub use error::{RenderError, ResourceError, ShaderError};
pub use renderable::Renderable;
pub use stats::{RenderingStats, StatsTracker};
pub use texture::Texture2D;
pub use types::*;
pub use uniform_buffer::{UniformBlockId, UniformBuffer, UniformBufferArray};
pub use vertex_attribute::{VertexAttribute, VertexAttributeArray};
