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

//! Task queues that move work onto the render thread.

use std::fmt::Debug;

/// A unit of work posted to another thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Accepts tasks to run on the thread that owns the scheduler.
pub trait Scheduler: Send + Sync + Debug {
    /// Queues `task`. Never runs it inline.
    fn schedule(&self, task: Task);
}

/// The task queue of the render thread.
///
/// Any thread may post; only the render thread drains it, through
/// [`run_pending`](Self::run_pending) at the start of every frame.
#[derive(Debug)]
pub struct RenderThreadScheduler {
    sender: flume::Sender<Task>,
    receiver: flume::Receiver<Task>,
}

impl RenderThreadScheduler {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Runs every queued task on the calling thread. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            count += 1;
        }
        if count > 0 {
            log::trace!("Ran {count} render thread tasks");
        }
        count
    }

    /// Number of tasks waiting.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for RenderThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for RenderThreadScheduler {
    fn schedule(&self, task: Task) {
        // The receiver lives as long as `self`, so sending cannot fail.
        if let Err(e) = self.sender.send(task) {
            log::error!("Failed to schedule render thread task: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_tasks_run_on_the_draining_thread() {
        let scheduler = Arc::new(RenderThreadScheduler::new());
        let ran_on = Arc::new(std::sync::Mutex::new(None));

        let poster = {
            let scheduler = scheduler.clone();
            let ran_on = ran_on.clone();
            thread::spawn(move || {
                scheduler.schedule(Box::new(move || {
                    *ran_on.lock().unwrap() = Some(thread::current().id());
                }));
            })
        };
        poster.join().unwrap();

        assert!(ran_on.lock().unwrap().is_none());
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(*ran_on.lock().unwrap(), Some(thread::current().id()));
    }

    #[test]
    fn test_run_pending_preserves_order() {
        let scheduler = RenderThreadScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for expected in 0..3 {
            let counter = counter.clone();
            scheduler.schedule(Box::new(move || {
                assert_eq!(counter.fetch_add(1, Ordering::SeqCst), expected);
            }));
        }
        assert_eq!(scheduler.run_pending(), 3);
        assert_eq!(scheduler.run_pending(), 0);
    }
}
