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

use cartograph_core::tile::{OverscaledTileId, Tile, TileCache, TileEvent, TileObserver};
use cartograph_core::RenderThreadScheduler;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn key(x: u32) -> OverscaledTileId {
    OverscaledTileId::from_zxy(8, x, 0)
}

fn renderable_tile(id: OverscaledTileId, source: &str) -> Tile {
    let (tx, _rx) = flume::unbounded();
    let mut tile = Tile::new(id, source, tx);
    tile.set_data(None);
    tile
}

fn cache(size: usize) -> (TileCache, Arc<RenderThreadScheduler>) {
    let scheduler = Arc::new(RenderThreadScheduler::new());
    (TileCache::new(size, scheduler.clone()), scheduler)
}

#[derive(Default)]
struct CancelCounter(AtomicUsize);

impl TileObserver for CancelCounter {
    fn on_tile_event(&self, _tile_id: &OverscaledTileId, event: &TileEvent) {
        if *event == TileEvent::Cancelled {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_capacity_holds_after_every_operation() {
    let (mut cache, _scheduler) = cache(3);
    let sizes = [3, 1, 0, 5, 2];
    let mut next = 0;
    for size in sizes {
        for _ in 0..4 {
            cache.add(key(next), renderable_tile(key(next), "s"));
            next += 1;
            assert!(cache.len() <= cache.size());
        }
        cache.set_size(size);
        assert!(cache.len() <= size);
    }
}

#[test]
fn test_duplicate_add_keeps_first_tile() {
    let (mut cache, scheduler) = cache(4);
    cache.add(key(1), renderable_tile(key(1), "first"));
    cache.add(key(1), renderable_tile(key(1), "second"));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&key(1)).map(|t| t.source_id()), Some("first"));
    // The duplicate is waiting to be dropped on the render thread.
    assert_eq!(scheduler.pending_count(), 1);
}

#[test]
fn test_duplicate_add_refreshes_recency() {
    let (mut cache, _scheduler) = cache(2);
    cache.add(key(1), renderable_tile(key(1), "a"));
    cache.add(key(2), renderable_tile(key(2), "b"));
    cache.add(key(1), renderable_tile(key(1), "a2"));
    cache.add(key(3), renderable_tile(key(3), "c"));

    assert!(cache.has(&key(1)));
    assert!(!cache.has(&key(2)));
}

#[test]
fn test_shrinking_evicts_oldest_first() {
    let (mut cache, scheduler) = cache(5);
    for x in 0..5 {
        cache.add(key(x), renderable_tile(key(x), "s"));
    }
    cache.set_size(2);

    assert_eq!(cache.len(), 2);
    assert_eq!(scheduler.pending_count(), 3);
    let keys: Vec<_> = cache.keys().copied().collect();
    assert_eq!(keys, vec![key(3), key(4)]);
}

#[test]
fn test_reads_do_not_promote() {
    let (mut cache, _scheduler) = cache(2);
    cache.add(key(1), renderable_tile(key(1), "a"));
    cache.add(key(2), renderable_tile(key(2), "b"));
    assert!(cache.get(&key(1)).is_some());
    assert!(cache.has(&key(1)));

    cache.add(key(3), renderable_tile(key(3), "c"));
    assert!(!cache.has(&key(1)));
    assert!(cache.has(&key(2)));
}

#[test]
fn test_unrenderable_tile_is_released_not_cached() {
    let (mut cache, scheduler) = cache(2);
    let (tx, _rx) = flume::unbounded();
    let tile = Tile::new(key(1), "s", tx);
    assert!(!tile.is_renderable());

    cache.add(key(1), tile);
    assert!(cache.is_empty());
    assert_eq!(scheduler.pending_count(), 1);
}

#[test]
fn test_zero_capacity_releases_everything() {
    let (mut cache, scheduler) = cache(0);
    cache.add(key(1), renderable_tile(key(1), "s"));
    assert!(cache.is_empty());
    assert_eq!(scheduler.pending_count(), 1);
}

#[test]
fn test_pop_returns_ownership_without_release() {
    let (mut cache, scheduler) = cache(2);
    cache.add(key(1), renderable_tile(key(1), "s"));

    let tile = cache.pop(&key(1)).expect("cached");
    assert!(!tile.is_cancelled());
    assert!(cache.is_empty());
    assert_eq!(cache.keys().count(), 0);
    assert_eq!(scheduler.pending_count(), 0);
    assert!(cache.pop(&key(1)).is_none());
}

#[test]
fn test_release_cancels_now_and_drops_on_render_thread() {
    let (mut cache, scheduler) = cache(1);
    let observer = Arc::new(CancelCounter::default());

    let mut tile = renderable_tile(key(1), "s");
    tile.set_observer(Some(observer.clone()));
    cache.add(key(1), tile);
    cache.add(key(2), renderable_tile(key(2), "s"));

    // Evicted: cancelled synchronously, still alive in the queue.
    assert_eq!(observer.0.load(Ordering::SeqCst), 1);
    assert_eq!(Arc::strong_count(&observer), 2);

    assert_eq!(scheduler.run_pending(), 1);
    assert_eq!(Arc::strong_count(&observer), 1);
}

#[test]
fn test_clear_releases_all() {
    let (mut cache, scheduler) = cache(3);
    for x in 0..3 {
        cache.add(key(x), renderable_tile(key(x), "s"));
    }
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(scheduler.run_pending(), 3);
}
