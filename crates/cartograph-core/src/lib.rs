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

//! # Cartograph Core
//!
//! Backend-agnostic graphics resource and draw-call model for rendering vector
//! map tiles, together with the tile cache that governs when GPU-backed tile
//! data is kept, evicted and destroyed.
//!
//! The concrete GPU backend lives in `cartograph-infra`; everything in this crate
//! talks to it only through the traits in [`gfx`].

#![warn(missing_docs)]

pub mod config;
pub mod gfx;
pub mod math;
pub mod renderer;
pub mod scheduler;
pub mod tile;

pub use config::{AtlasConfig, ConfigError, RendererConfig};
pub use scheduler::{RenderThreadScheduler, Scheduler};
pub use tile::{OverscaledTileId, Tile, TileCache};
