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

//! Tiles, their parsed geometry, and the cache of off-screen tiles.

pub mod bucket;
pub mod cache;
pub mod geometry_tile;
pub mod tile_id;
pub mod worker;

pub use bucket::Bucket;
pub use cache::TileCache;
pub use geometry_tile::{Tile, TileEvent, TileObserver};
pub use tile_id::{CanonicalTileId, OverscaledTileId, UnwrappedTileId, EXTENT, TILE_SIZE};
pub use worker::{
    process_request, ParseError, ParseRequest, ParseResult, TileParser, TileWorkerPool,
    WorkerMessage,
};
