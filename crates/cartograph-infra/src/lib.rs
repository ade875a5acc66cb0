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


//! # Cartograph Infra
//!
//! Concrete implementations of the contracts defined in `cartograph-core`.
//!
//! The only GPU backend is built on `wgpu`, which drives Vulkan, Metal, OpenGL
//! or WebGPU depending on the [`BackendType`](cartograph_core::gfx::BackendType)
//! requested at construction. The crate also owns logger initialisation.

#![warn(missing_docs)]

pub mod graphics;
pub mod logging;

#[cfg(feature = "graphics")]
pub use graphics::wgpu::{WgpuAdapterSelector, WgpuContext, WgpuRendererBackend};
pub use logging::{init_logging, LoggingConfig};
