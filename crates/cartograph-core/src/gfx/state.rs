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

//! Cached global GPU state.
//!
//! A [`State`] remembers the value the backend *assumes* is currently set and
//! only issues the setter when a different value is requested. Code that changes
//! the state behind the backend's back must report it through `assume` or
//! `set_dirty`, otherwise the next `set` may be skipped wrongly.

/// One cached piece of state.
#[derive(Debug, Clone)]
pub struct State<T> {
    current: T,
    dirty: bool,
}

impl<T: PartialEq + Clone> State<T> {
    /// Creates a state that is dirty, so the first `set` always applies.
    pub fn new(initial: T) -> Self {
        Self {
            current: initial,
            dirty: true,
        }
    }

    /// Applies `value` through `apply` unless it is already the assumed value.
    /// Returns `true` if `apply` ran.
    pub fn set(&mut self, value: T, apply: impl FnOnce(&T)) -> bool {
        if !self.dirty && self.current == value {
            return false;
        }
        apply(&value);
        self.current = value;
        self.dirty = false;
        true
    }

    /// Records that `value` was set by someone else.
    pub fn assume(&mut self, value: T) {
        self.current = value;
        self.dirty = false;
    }

    /// Forgets the assumed value; the next `set` always applies.
    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns `true` if the assumed value is unknown.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The assumed value.
    pub fn current(&self) -> &T {
        &self.current
    }
}

/// Viewport rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

/// Scissor rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScissorRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

/// Identifies the render target currently bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramebufferBinding(pub u64);

/// The pieces of global state a context tracks.
#[derive(Debug, Clone)]
pub struct ContextState {
    /// Current viewport.
    pub viewport: State<Viewport>,
    /// Current scissor rectangle.
    pub scissor: State<ScissorRect>,
    /// Current render target.
    pub framebuffer: State<FramebufferBinding>,
}

impl ContextState {
    /// Creates a fully dirty state set.
    pub fn new() -> Self {
        Self {
            viewport: State::new(Viewport::default()),
            scissor: State::new(ScissorRect::default()),
            framebuffer: State::new(FramebufferBinding::default()),
        }
    }

    /// Marks every piece of state dirty.
    pub fn set_dirty(&mut self) {
        self.viewport.set_dirty();
        self.scissor.set_dirty();
        self.framebuffer.set_dirty();
    }
}

impl Default for ContextState {
    fn default() -> Self {
        Self::new()
    }
}
