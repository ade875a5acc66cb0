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

//! Background tile parsing.

use super::bucket::Bucket;
use super::tile_id::OverscaledTileId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A decoding failure reported by a [`TileParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tile parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Turns raw tile data into per-layer buckets. Runs on worker threads.
pub trait TileParser: Send + Sync {
    /// Decodes `data` for `tile_id`.
    fn parse(&self, tile_id: &OverscaledTileId, data: &[u8]) -> Result<Vec<Bucket>, ParseError>;
}

/// One unit of parse work.
#[derive(Debug)]
pub struct ParseRequest {
    /// The tile the data belongs to.
    pub tile_id: OverscaledTileId,
    /// Echoed back in the result so the tile can drop superseded work.
    pub correlation_id: u64,
    /// Raw tile data.
    pub data: Arc<[u8]>,
    /// Set once the tile is cancelled; the worker then skips or discards the work.
    pub obsolete: Arc<AtomicBool>,
    /// Where the result goes.
    pub reply: flume::Sender<ParseResult>,
}

/// The outcome of a [`ParseRequest`].
#[derive(Debug)]
pub struct ParseResult {
    /// The tile the data belongs to.
    pub tile_id: OverscaledTileId,
    /// Copied from the request.
    pub correlation_id: u64,
    /// Parsed buckets or the parse failure.
    pub outcome: Result<Vec<Bucket>, ParseError>,
}

/// Messages understood by the worker threads.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Parse a tile.
    Parse(ParseRequest),
    /// Stop one worker thread.
    Shutdown,
}

/// Executes one request with `parser`. Returns `None` when the tile went
/// obsolete before or during parsing.
pub fn process_request(parser: &dyn TileParser, request: &ParseRequest) -> Option<ParseResult> {
    if request.obsolete.load(Ordering::Acquire) {
        return None;
    }
    let outcome = parser.parse(&request.tile_id, &request.data);
    if request.obsolete.load(Ordering::Acquire) {
        return None;
    }
    Some(ParseResult {
        tile_id: request.tile_id,
        correlation_id: request.correlation_id,
        outcome,
    })
}

/// A fixed set of threads parsing tiles off the render thread.
///
/// Requests are shared through one queue; any idle thread takes the next one.
pub struct TileWorkerPool {
    sender: flume::Sender<WorkerMessage>,
    handles: Vec<JoinHandle<()>>,
}

impl TileWorkerPool {
    /// Starts `threads` workers (at least one) sharing `parser`.
    pub fn new(threads: usize, parser: Arc<dyn TileParser>) -> Self {
        let (sender, receiver) = flume::unbounded::<WorkerMessage>();
        let handles = (0..threads.max(1))
            .map(|index| {
                let receiver = receiver.clone();
                let parser = Arc::clone(&parser);
                thread::spawn(move || {
                    log::debug!("Tile worker {} started", index);
                    while let Ok(message) = receiver.recv() {
                        let request = match message {
                            WorkerMessage::Parse(request) => request,
                            WorkerMessage::Shutdown => break,
                        };
                        match process_request(parser.as_ref(), &request) {
                            Some(result) => {
                                // The tile may be gone; its result is then moot.
                                let _ = request.reply.send(result);
                            }
                            None => log::trace!("Skipped obsolete parse of {}", request.tile_id),
                        }
                    }
                    log::debug!("Tile worker {} stopped", index);
                })
            })
            .collect();
        Self { sender, handles }
    }

    /// A handle tiles use to submit work.
    pub fn sender(&self) -> flume::Sender<WorkerMessage> {
        self.sender.clone()
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }
}

impl fmt::Debug for TileWorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileWorkerPool")
            .field("threads", &self.handles.len())
            .finish()
    }
}

impl Drop for TileWorkerPool {
    fn drop(&mut self) {
        for _ in &self.handles {
            let _ = self.sender.send(WorkerMessage::Shutdown);
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("A tile worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::geometry_tile::Tile;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct CountingParser {
        calls: AtomicUsize,
    }

    impl TileParser for CountingParser {
        fn parse(&self, _tile_id: &OverscaledTileId, data: &[u8]) -> Result<Vec<Bucket>, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if data == b"bad" {
                return Err(ParseError("truncated".to_string()));
            }
            Ok(vec![Bucket::from_geometry("water", vec![[0, 0]; 3], vec![0, 1, 2])])
        }
    }

    fn request(
        correlation_id: u64,
        data: &[u8],
        obsolete: bool,
    ) -> (ParseRequest, flume::Receiver<ParseResult>) {
        let (reply, results) = flume::unbounded();
        let request = ParseRequest {
            tile_id: OverscaledTileId::from_zxy(2, 1, 1),
            correlation_id,
            data: Arc::from(data),
            obsolete: Arc::new(AtomicBool::new(obsolete)),
            reply,
        };
        (request, results)
    }

    #[test]
    fn test_obsolete_request_is_not_parsed() {
        let parser = CountingParser::default();
        let (request, _results) = request(1, b"pbf", true);
        assert!(process_request(&parser, &request).is_none());
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_result_carries_correlation_id() {
        let parser = CountingParser::default();
        let (request, _results) = request(7, b"bad", false);
        let result = process_request(&parser, &request).expect("not obsolete");
        assert_eq!(result.correlation_id, 7);
        assert_eq!(result.tile_id, request.tile_id);
        assert_eq!(result.outcome.err(), Some(ParseError("truncated".to_string())));
    }

    #[test]
    fn test_pool_parses_off_thread_into_tile() {
        let pool = TileWorkerPool::new(2, Arc::new(CountingParser::default()));
        assert_eq!(pool.thread_count(), 2);
        let mut tile = Tile::new(OverscaledTileId::from_zxy(4, 3, 5), "streets", pool.sender());
        tile.set_data(Some(Arc::from(&b"pbf"[..])));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !tile.poll_results() {
            assert!(Instant::now() < deadline, "worker never replied");
            thread::sleep(Duration::from_millis(1));
        }
        assert!(tile.is_loaded() && !tile.is_pending());
        assert_eq!(tile.bucket("water").map(|b| b.indices().len()), Some(3));
    }

    #[test]
    fn test_cancelled_request_gets_no_reply() {
        let parser = Arc::new(CountingParser::default());
        let pool = TileWorkerPool::new(1, parser.clone());
        let (cancelled, cancelled_results) = request(1, b"pbf", true);
        let (live, live_results) = request(2, b"pbf", false);
        pool.sender().send(WorkerMessage::Parse(cancelled)).unwrap();
        pool.sender().send(WorkerMessage::Parse(live)).unwrap();

        let result = live_results
            .recv_timeout(Duration::from_secs(5))
            .expect("live request answered");
        assert_eq!(result.correlation_id, 2);
        assert!(cancelled_results.try_recv().is_err());
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_joins_every_worker() {
        let parser = Arc::new(CountingParser::default());
        let pool = TileWorkerPool::new(3, parser.clone());
        let sender = pool.sender();
        assert_eq!(Arc::strong_count(&parser), 4);

        drop(pool);
        assert_eq!(Arc::strong_count(&parser), 1);
        let (request, results) = request(1, b"pbf", false);
        assert!(sender.send(WorkerMessage::Parse(request)).is_err());
        assert!(results.try_recv().is_err());
    }
}
