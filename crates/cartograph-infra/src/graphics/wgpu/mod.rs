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


//! The wgpu implementation of the renderer backend.
//!
//! One backend drives Vulkan, Metal, OpenGL and WebGPU; which API is used is
//! settled by adapter selection at startup.

mod backend;
mod buffer;
mod command;
mod context;
mod conversions;
mod device;
mod drawable;
mod renderable;
mod shader;
pub mod shaders;
mod system;
mod texture;

pub use backend::{adapter_backend_type, backend_name, SelectedAdapter, WgpuAdapterSelector};
pub use buffer::{WgpuBuffer, WgpuUniformBuffer};
pub use command::{WgpuCommandEncoder, WgpuRenderPass, WgpuUploadPass};
pub use context::WgpuContext;
pub use conversions::{backend_type_from_wgpu, IntoWgpu};
pub use device::WgpuDevice;
pub use drawable::WgpuDrawable;
pub use renderable::{AcquiredFrame, WgpuRenderable};
pub use shader::{PipelineKey, VertexBufferKey, WgpuShaderProgram};
pub use system::WgpuRendererBackend;
pub use texture::WgpuTexture2D;
