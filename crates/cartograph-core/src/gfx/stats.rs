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

//! Rendering statistics kept by a context.

use std::sync::atomic::{AtomicU64, Ordering};

/// A snapshot of the resource and draw counters of a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderingStats {
    /// Frames begun since the context was created.
    pub num_frames: u64,
    /// Draw calls encoded in the last completed frame.
    pub num_draw_calls: u64,
    /// Triangles submitted in the last completed frame.
    pub num_triangles: u64,
    /// Drawables currently alive.
    pub num_drawables: u64,
    /// Textures currently alive.
    pub num_active_textures: u64,
    /// Buffers currently alive (vertex, index and uniform).
    pub num_buffers: u64,
    /// Bytes held by live textures.
    pub memory_textures: u64,
    /// Bytes held by live buffers.
    pub memory_buffers: u64,
}

/// Lock-free counters behind [`RenderingStats`].
///
/// Resources report their creation and destruction here; the frame counters are
/// rolled over by [`begin_frame`](StatsTracker::begin_frame).
#[derive(Debug, Default)]
pub struct StatsTracker {
    frames: AtomicU64,
    draw_calls: AtomicU64,
    triangles: AtomicU64,
    last_draw_calls: AtomicU64,
    last_triangles: AtomicU64,
    drawables: AtomicU64,
    textures: AtomicU64,
    buffers: AtomicU64,
    texture_bytes: AtomicU64,
    buffer_bytes: AtomicU64,
}

fn saturating_sub(counter: &AtomicU64, value: u64) {
    // fetch_update only fails when the closure returns None, which it never does here.
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(v.saturating_sub(value))
    });
}

impl StatsTracker {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame, publishing the draw counters of the previous one.
    pub fn begin_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.last_draw_calls
            .store(self.draw_calls.swap(0, Ordering::Relaxed), Ordering::Relaxed);
        self.last_triangles
            .store(self.triangles.swap(0, Ordering::Relaxed), Ordering::Relaxed);
    }

    /// Records one draw call.
    pub fn record_draw(&self, triangles: u64) {
        self.draw_calls.fetch_add(1, Ordering::Relaxed);
        self.triangles.fetch_add(triangles, Ordering::Relaxed);
    }

    /// Records a new drawable.
    pub fn drawable_created(&self) {
        self.drawables.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dropped drawable.
    pub fn drawable_released(&self) {
        saturating_sub(&self.drawables, 1);
    }

    /// Records a texture allocation of `bytes`.
    pub fn texture_created(&self, bytes: u64) {
        self.textures.fetch_add(1, Ordering::Relaxed);
        self.texture_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a texture release.
    pub fn texture_released(&self, bytes: u64) {
        saturating_sub(&self.textures, 1);
        saturating_sub(&self.texture_bytes, bytes);
    }

    /// Records a buffer allocation of `bytes`.
    pub fn buffer_created(&self, bytes: u64) {
        self.buffers.fetch_add(1, Ordering::Relaxed);
        self.buffer_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a buffer release.
    pub fn buffer_released(&self, bytes: u64) {
        saturating_sub(&self.buffers, 1);
        saturating_sub(&self.buffer_bytes, bytes);
    }

    /// Returns the current values.
    pub fn snapshot(&self) -> RenderingStats {
        RenderingStats {
            num_frames: self.frames.load(Ordering::Relaxed),
            num_draw_calls: self.last_draw_calls.load(Ordering::Relaxed),
            num_triangles: self.last_triangles.load(Ordering::Relaxed),
            num_drawables: self.drawables.load(Ordering::Relaxed),
            num_active_textures: self.textures.load(Ordering::Relaxed),
            num_buffers: self.buffers.load(Ordering::Relaxed),
            memory_textures: self.texture_bytes.load(Ordering::Relaxed),
            memory_buffers: self.buffer_bytes.load(Ordering::Relaxed),
        }
    }
}
