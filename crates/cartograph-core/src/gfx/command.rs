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

//! Command recording: the encoder of one frame and the passes it opens.

use super::buffer::{BufferResource, BufferUsage};
use super::error::{RenderError, ResourceError};
use super::state::{ScissorRect, Viewport};
use super::texture::Texture2D;
use super::types::Rect;
use std::any::Any;
use std::sync::Arc;

/// How a render pass initializes its attachments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPassDescriptor {
    /// Clear color, or `None` to load the existing contents.
    pub clear_color: Option<[f64; 4]>,
    /// Clear depth, or `None` to load.
    pub clear_depth: Option<f32>,
    /// Clear stencil, or `None` to load.
    pub clear_stencil: Option<u32>,
}

/// A pass that moves CPU data into GPU resources.
///
/// Buffers are created here rather than on the context so that backends can
/// batch the copies into the frame's command stream.
pub trait UploadPass {
    /// Creates a buffer initialized with `data`.
    fn create_buffer(
        &mut self,
        label: &str,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Arc<dyn BufferResource>, ResourceError>;

    /// Replaces the contents of `buffer`. `data` must match its size.
    fn update_buffer(
        &mut self,
        buffer: &dyn BufferResource,
        data: &[u8],
    ) -> Result<(), ResourceError>;

    /// Uploads pixels into `texture`, either whole or into `region`.
    fn upload_texture(
        &mut self,
        texture: &dyn Texture2D,
        pixels: &[u8],
        region: Option<Rect>,
    ) -> Result<(), ResourceError> {
        match region {
            Some(region) => texture.upload_sub_region(pixels, region),
            None => texture.upload(pixels),
        }
    }

    /// Opens a named debug group.
    fn push_debug_group(&mut self, name: &str);

    /// Closes the innermost debug group.
    fn pop_debug_group(&mut self);

    /// Allows drawables to recover the backend pass.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A pass that records draw calls into one render target.
///
/// Drawables downcast it through [`as_any_mut`](RenderPass::as_any_mut) to reach
/// the backend's native pass.
pub trait RenderPass {
    /// The descriptor the pass was opened with.
    fn descriptor(&self) -> &RenderPassDescriptor;

    /// Sets the viewport, skipped when unchanged.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Sets the scissor rectangle, skipped when unchanged.
    fn set_scissor(&mut self, rect: ScissorRect);

    /// Opens a named debug group.
    fn push_debug_group(&mut self, name: &str);

    /// Closes the innermost debug group.
    fn pop_debug_group(&mut self);

    /// Allows drawables to recover the backend pass.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Records the passes of one frame.
///
/// Each pass borrows the encoder mutably, so only one pass is open at a time;
/// dropping a pass ends it.
pub trait CommandEncoder {
    /// Opens an upload pass.
    fn create_upload_pass(&mut self, name: &str) -> Box<dyn UploadPass + '_>;

    /// Opens a render pass on the default renderable.
    fn create_render_pass(
        &mut self,
        name: &str,
        descriptor: RenderPassDescriptor,
    ) -> Result<Box<dyn RenderPass + '_>, RenderError>;

    /// Opens a named debug group.
    fn push_debug_group(&mut self, name: &str);

    /// Closes the innermost debug group.
    fn pop_debug_group(&mut self);

    /// Finishes recording and submits the commands, presenting the target if one
    /// was acquired.
    fn submit(self: Box<Self>) -> Result<(), RenderError>;
}

/// Closes a debug group when dropped.
pub struct DebugGroup<'a, P: RenderPass + ?Sized> {
    pass: &'a mut P,
}

impl<'a, P: RenderPass + ?Sized> DebugGroup<'a, P> {
    /// Opens `name` on `pass`.
    pub fn new(pass: &'a mut P, name: &str) -> Self {
        pass.push_debug_group(name);
        Self { pass }
    }

    /// The pass the group was opened on.
    pub fn pass(&mut self) -> &mut P {
        self.pass
    }
}

impl<P: RenderPass + ?Sized> Drop for DebugGroup<'_, P> {
    fn drop(&mut self) {
        self.pass.pop_debug_group();
    }
}
