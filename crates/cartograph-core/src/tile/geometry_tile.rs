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

//! A tile of a vector source and its parse lifecycle.

use super::bucket::Bucket;
use super::tile_id::OverscaledTileId;
use super::worker::{ParseRequest, ParseResult, WorkerMessage};
use crate::gfx::command::UploadPass;
use crate::gfx::error::ResourceError;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle notifications emitted by a [`Tile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileEvent {
    /// Data was handed to a worker.
    StartParse,
    /// Parsed buckets replaced the previous ones.
    EndParse,
    /// The tile was cancelled; no further results will be applied.
    Cancelled,
    /// Parsing or dispatch failed.
    Error(String),
}

/// Receives [`TileEvent`]s, typically the tile pyramid that owns the tile.
pub trait TileObserver: Send + Sync {
    /// Called on the thread driving the tile.
    fn on_tile_event(&self, tile_id: &OverscaledTileId, event: &TileEvent);
}

/// One tile of a vector source.
///
/// Data goes to a worker through [`set_data`](Self::set_data); results come
/// back through [`poll_results`](Self::poll_results). Each `set_data` bumps a
/// correlation id, and results carrying an older id are discarded, as is
/// everything arriving after [`cancel`](Self::cancel).
pub struct Tile {
    id: OverscaledTileId,
    source_id: String,
    loaded: bool,
    renderable: bool,
    pending: bool,
    obsolete: Arc<AtomicBool>,
    correlation_id: u64,
    buckets: HashMap<String, Bucket>,
    worker: flume::Sender<WorkerMessage>,
    results_tx: flume::Sender<ParseResult>,
    results_rx: flume::Receiver<ParseResult>,
    observer: Option<Arc<dyn TileObserver>>,
}

impl Tile {
    /// Creates an empty tile sending parse work to `worker`.
    pub fn new(
        id: OverscaledTileId,
        source_id: impl Into<String>,
        worker: flume::Sender<WorkerMessage>,
    ) -> Self {
        let (results_tx, results_rx) = flume::unbounded();
        Self {
            id,
            source_id: source_id.into(),
            loaded: false,
            renderable: false,
            pending: false,
            obsolete: Arc::new(AtomicBool::new(false)),
            correlation_id: 0,
            buckets: HashMap::new(),
            worker,
            results_tx,
            results_rx,
            observer: None,
        }
    }

    /// Installs the observer notified of loads and errors.
    pub fn set_observer(&mut self, observer: Option<Arc<dyn TileObserver>>) {
        self.observer = observer;
    }

    /// Tile position.
    pub fn id(&self) -> &OverscaledTileId {
        &self.id
    }

    /// Source the tile was requested from.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Id of the most recent parse request.
    pub fn correlation_id(&self) -> u64 {
        self.correlation_id
    }

    /// Returns `true` once data (or its absence) was applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns `true` if the tile has something to draw or is known to be empty.
    pub fn is_renderable(&self) -> bool {
        self.renderable
    }

    /// Returns `true` while a parse request is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns `true` after [`cancel`](Self::cancel).
    pub fn is_cancelled(&self) -> bool {
        self.obsolete.load(Ordering::Acquire)
    }

    /// Geometry by style layer.
    pub fn buckets(&self) -> &HashMap<String, Bucket> {
        &self.buckets
    }

    /// Geometry of one style layer.
    pub fn bucket(&self, layer_id: &str) -> Option<&Bucket> {
        self.buckets.get(layer_id)
    }

    fn notify(&self, event: TileEvent) {
        if let Some(observer) = &self.observer {
            observer.on_tile_event(&self.id, &event);
        }
    }

    /// Hands new data to the worker. `None` marks the tile as loaded and empty.
    ///
    /// Any parse still in flight is superseded.
    pub fn set_data(&mut self, data: Option<Arc<[u8]>>) {
        if self.is_cancelled() {
            log::debug!("Ignoring data for cancelled tile {}", self.id);
            return;
        }
        self.correlation_id += 1;

        let Some(data) = data else {
            self.buckets.clear();
            self.loaded = true;
            self.renderable = true;
            self.pending = false;
            return;
        };

        let request = ParseRequest {
            tile_id: self.id,
            correlation_id: self.correlation_id,
            data,
            obsolete: Arc::clone(&self.obsolete),
            reply: self.results_tx.clone(),
        };
        if self.worker.send(WorkerMessage::Parse(request)).is_err() {
            log::error!("No tile worker to parse {}", self.id);
            self.pending = false;
            self.notify(TileEvent::Error("tile workers are gone".to_string()));
            return;
        }
        self.pending = true;
        self.notify(TileEvent::StartParse);
    }

    /// Applies finished parse results. Returns `true` if the buckets changed.
    ///
    /// Replaced buckets are dropped here, so this runs on the render thread.
    pub fn poll_results(&mut self) -> bool {
        let mut changed = false;
        while let Ok(result) = self.results_rx.try_recv() {
            if self.is_cancelled() || result.correlation_id != self.correlation_id {
                log::trace!(
                    "Discarding stale parse result {} for {} (current {})",
                    result.correlation_id,
                    self.id,
                    self.correlation_id
                );
                continue;
            }
            self.pending = false;
            match result.outcome {
                Ok(buckets) => {
                    self.buckets = buckets
                        .into_iter()
                        .map(|b| (b.layer_id().to_string(), b))
                        .collect();
                    self.loaded = true;
                    self.renderable = true;
                    changed = true;
                    self.notify(TileEvent::EndParse);
                }
                Err(e) => {
                    log::warn!("Failed to parse tile {}: {}", self.id, e);
                    self.notify(TileEvent::Error(e.to_string()));
                }
            }
        }
        changed
    }

    /// Creates GPU buffers for buckets that have none yet.
    pub fn upload(&mut self, pass: &mut dyn UploadPass) -> Result<(), ResourceError> {
        self.buckets.values_mut().try_for_each(|b| b.upload(pass))
    }

    /// Drops all data and supersedes in-flight work. Runs on the render thread.
    pub fn reset(&mut self) {
        self.correlation_id += 1;
        self.buckets.clear();
        self.loaded = false;
        self.renderable = false;
        self.pending = false;
    }

    /// Stops in-flight work for good. Calling it again has no effect.
    pub fn cancel(&mut self) {
        if self.obsolete.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pending = false;
        log::trace!("Cancelled tile {}", self.id);
        self.notify(TileEvent::Cancelled);
    }

    /// Marks the tile renderable without data, e.g. a placeholder kept while a
    /// child loads.
    pub fn set_renderable(&mut self, renderable: bool) {
        self.renderable = renderable;
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("id", &self.id)
            .field("source_id", &self.source_id)
            .field("loaded", &self.loaded)
            .field("renderable", &self.renderable)
            .field("pending", &self.pending)
            .field("correlation_id", &self.correlation_id)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<TileEvent>>);

    impl TileObserver for Recorder {
        fn on_tile_event(&self, _tile_id: &OverscaledTileId, event: &TileEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn take_request(rx: &flume::Receiver<WorkerMessage>) -> ParseRequest {
        match rx.try_recv().expect("a request was sent") {
            WorkerMessage::Parse(request) => request,
            WorkerMessage::Shutdown => panic!("unexpected shutdown"),
        }
    }

    fn reply(request: &ParseRequest, layer: &str) {
        request
            .reply
            .send(ParseResult {
                tile_id: request.tile_id,
                correlation_id: request.correlation_id,
                outcome: Ok(vec![Bucket::from_geometry(layer, vec![[0, 0]; 3], vec![0, 1, 2])]),
            })
            .unwrap();
    }

    #[test]
    fn test_result_applies_buckets() {
        let (tx, rx) = flume::unbounded();
        let recorder = Arc::new(Recorder::default());
        let mut tile = Tile::new(OverscaledTileId::from_zxy(3, 1, 2), "streets", tx);
        tile.set_observer(Some(recorder.clone()));

        tile.set_data(Some(Arc::from(&b"pbf"[..])));
        assert!(tile.is_pending());
        reply(&take_request(&rx), "water");

        assert!(tile.poll_results());
        assert!(tile.is_renderable() && tile.is_loaded() && !tile.is_pending());
        assert!(tile.bucket("water").is_some());
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![TileEvent::StartParse, TileEvent::EndParse]
        );
    }

    #[test]
    fn test_superseded_result_is_discarded() {
        let (tx, rx) = flume::unbounded();
        let mut tile = Tile::new(OverscaledTileId::from_zxy(3, 1, 2), "streets", tx);

        tile.set_data(Some(Arc::from(&b"v1"[..])));
        let first = take_request(&rx);
        tile.set_data(Some(Arc::from(&b"v2"[..])));
        let second = take_request(&rx);

        reply(&first, "old");
        assert!(!tile.poll_results());
        assert!(tile.is_pending());

        reply(&second, "new");
        assert!(tile.poll_results());
        assert!(tile.bucket("new").is_some());
        assert!(tile.bucket("old").is_none());
    }

    #[test]
    fn test_cancel_is_idempotent_and_blocks_results() {
        let (tx, rx) = flume::unbounded();
        let recorder = Arc::new(Recorder::default());
        let mut tile = Tile::new(OverscaledTileId::from_zxy(0, 0, 0), "streets", tx);
        tile.set_observer(Some(recorder.clone()));

        tile.set_data(Some(Arc::from(&b"pbf"[..])));
        let request = take_request(&rx);
        tile.cancel();
        tile.cancel();
        assert!(request.obsolete.load(Ordering::Acquire));

        reply(&request, "water");
        assert!(!tile.poll_results());
        assert!(tile.buckets().is_empty());
        let events = recorder.0.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == TileEvent::Cancelled).count(), 1);
    }

    #[test]
    fn test_empty_data_is_renderable() {
        let (tx, _rx) = flume::unbounded();
        let mut tile = Tile::new(OverscaledTileId::from_zxy(0, 0, 0), "streets", tx);
        tile.set_data(None);
        assert!(tile.is_loaded() && tile.is_renderable());
        assert!(!tile.is_pending());
    }
}
