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

//! Per-frame values shared by every layer.

use super::transform::TransformState;
use crate::gfx::types::RenderPasses;

/// Per-frame inputs shared by every layer tweaker and drawable.
#[derive(Debug, Clone)]
pub struct PaintParameters {
    /// Camera of the frame.
    pub state: TransformState,
    /// Device pixel ratio.
    pub pixel_ratio: f32,
    /// Frame counter.
    pub frame: u64,
    /// The pass currently being rendered.
    pub render_pass: RenderPasses,
}

impl PaintParameters {
    /// Parameters for frame `frame` seen through `state`.
    pub fn new(state: TransformState, pixel_ratio: f32, frame: u64) -> Self {
        Self {
            state,
            pixel_ratio,
            frame,
            render_pass: RenderPasses::NONE,
        }
    }
}
