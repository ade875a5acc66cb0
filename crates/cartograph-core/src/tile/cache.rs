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

//! The LRU cache of tiles that left the view.

use super::geometry_tile::Tile;
use super::tile_id::OverscaledTileId;
use crate::scheduler::Scheduler;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Off-screen tiles kept around for reuse, evicted oldest first.
///
/// Lookups do not refresh recency; only [`add`](Self::add) does. Tiles leaving
/// the cache other than through [`pop`](Self::pop) are cancelled right away and
/// then dropped on the render thread through the scheduler, since dropping a
/// tile releases GPU buffers.
///
/// The cache is driven from a single thread, the owner of the tile pyramid.
#[derive(Debug)]
pub struct TileCache {
    tiles: HashMap<OverscaledTileId, Tile>,
    ordered_keys: VecDeque<OverscaledTileId>,
    size: usize,
    scheduler: Arc<dyn Scheduler>,
}

impl TileCache {
    /// Creates a cache holding at most `size` tiles.
    pub fn new(size: usize, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            tiles: HashMap::new(),
            ordered_keys: VecDeque::new(),
            size,
            scheduler,
        }
    }

    /// Capacity.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.ordered_keys.len()
    }

    /// Returns `true` if no tile is cached.
    pub fn is_empty(&self) -> bool {
        self.ordered_keys.is_empty()
    }

    /// Keys from least to most recently added.
    pub fn keys(&self) -> impl Iterator<Item = &OverscaledTileId> {
        self.ordered_keys.iter()
    }

    /// Changes the capacity, releasing the oldest tiles that no longer fit.
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
        self.evict_overflow();
        self.check_invariant();
    }

    /// Caches `tile` under `key`.
    ///
    /// A tile that is not renderable, or any tile when the capacity is zero,
    /// is released instead. When `key` is already cached the new tile is
    /// released, the cached one is kept and becomes the most recent.
    pub fn add(&mut self, key: OverscaledTileId, tile: Tile) {
        if !tile.is_renderable() || self.size == 0 {
            self.deferred_release(tile);
            return;
        }

        if self.tiles.contains_key(&key) {
            log::debug!("Tile {} already cached; keeping the existing one", key);
            self.ordered_keys.retain(|k| *k != key);
            self.deferred_release(tile);
        } else {
            self.tiles.insert(key, tile);
        }
        self.ordered_keys.push_back(key);

        self.evict_overflow();
        self.check_invariant();
    }

    /// Returns the tile cached under `key` without changing its recency.
    pub fn get(&self, key: &OverscaledTileId) -> Option<&Tile> {
        self.tiles.get(key)
    }

    /// Mutable access, without changing recency.
    pub fn get_mut(&mut self, key: &OverscaledTileId) -> Option<&mut Tile> {
        self.tiles.get_mut(key)
    }

    /// Returns `true` if `key` is cached.
    pub fn has(&self, key: &OverscaledTileId) -> bool {
        self.tiles.contains_key(key)
    }

    /// Removes the tile under `key` and hands it back without releasing it.
    pub fn pop(&mut self, key: &OverscaledTileId) -> Option<Tile> {
        let tile = self.tiles.remove(key)?;
        self.ordered_keys.retain(|k| k != key);
        self.check_invariant();
        Some(tile)
    }

    /// Releases every cached tile.
    pub fn clear(&mut self) {
        let keys: Vec<OverscaledTileId> = self.ordered_keys.drain(..).collect();
        for key in keys {
            if let Some(tile) = self.tiles.remove(&key) {
                self.deferred_release(tile);
            }
        }
        debug_assert!(self.tiles.is_empty());
    }

    /// Cancels `tile` now and schedules its drop on the render thread.
    pub fn deferred_release(&self, mut tile: Tile) {
        tile.cancel();
        log::trace!("Scheduling release of tile {}", tile.id());
        self.scheduler.schedule(Box::new(move || drop(tile)));
    }

    fn evict_overflow(&mut self) {
        while self.ordered_keys.len() > self.size {
            let Some(oldest) = self.ordered_keys.pop_front() else {
                break;
            };
            if let Some(tile) = self.tiles.remove(&oldest) {
                log::debug!("Evicting tile {} from cache", oldest);
                self.deferred_release(tile);
            }
        }
    }

    fn check_invariant(&self) {
        debug_assert!(
            self.ordered_keys.len() <= self.size,
            "tile cache holds {} tiles over a capacity of {}",
            self.ordered_keys.len(),
            self.size
        );
        debug_assert_eq!(self.ordered_keys.len(), self.tiles.len());
    }
}
