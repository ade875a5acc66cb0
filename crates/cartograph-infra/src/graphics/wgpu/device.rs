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


//! The logical device shared by every resource of the wgpu backend.

use cartograph_core::gfx::backend::AdapterInfo;
use cartograph_core::gfx::error::RenderError;
use cartograph_core::gfx::stats::StatsTracker;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Device, queue and bookkeeping shared by reference count between the
/// context, its resources and the command encoders.
pub struct WgpuDevice {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    info: AdapterInfo,
    stats: StatsTracker,
    lost: Arc<AtomicBool>,
    lost_reason: Arc<Mutex<Option<String>>>,
    next_resource_id: AtomicU64,
}

impl fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("adapter", &self.info.name)
            .field("backend", &self.info.backend_type)
            .field("lost", &self.is_lost())
            .finish()
    }
}

impl WgpuDevice {
    /// Wraps a freshly requested device and installs its error callbacks.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, info: AdapterInfo) -> Self {
        device.on_uncaptured_error(Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let lost = Arc::new(AtomicBool::new(false));
        let lost_reason = Arc::new(Mutex::new(None));
        {
            let lost = lost.clone();
            let lost_reason = lost_reason.clone();
            device.set_device_lost_callback(move |reason, message| {
                log::error!("WGPU device lost ({reason:?}): {message}");
                *lost_reason.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(format!("{reason:?}: {message}"));
                lost.store(true, Ordering::Release);
            });
        }

        Self {
            device,
            queue,
            info,
            stats: StatsTracker::new(),
            lost,
            lost_reason,
            next_resource_id: AtomicU64::new(1),
        }
    }

    /// The native device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The native queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The adapter the device was created from.
    pub fn info(&self) -> &AdapterInfo {
        &self.info
    }

    /// Resource counters reported through `Context::stats`.
    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    /// Returns a process-unique id for labels and render target bindings.
    pub(crate) fn next_id(&self) -> u64 {
        self.next_resource_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns `true` once the driver reported the device lost.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Fails with [`RenderError::DeviceLost`] once the device is gone.
    pub fn check_alive(&self) -> Result<(), RenderError> {
        if !self.is_lost() {
            return Ok(());
        }
        let reason = self
            .lost_reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| "unknown reason".to_string());
        Err(RenderError::DeviceLost(reason))
    }

    /// Processes finished GPU work without blocking.
    pub fn poll_non_blocking(&self) {
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("Failed to poll device: {:?}", e);
        }
    }

    /// Blocks until the queue is idle.
    pub fn poll_blocking(&self) {
        if let Err(e) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("Failed to poll device while waiting: {:?}", e);
        }
    }
}
