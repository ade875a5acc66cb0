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


//! Frame recording: one encoder per frame, upload passes recorded into their
//! own command buffers and submitted ahead of the frame's draws.

use super::buffer::WgpuBuffer;
use super::device::WgpuDevice;
use super::renderable::{AcquiredFrame, WgpuRenderable};
use cartograph_core::gfx::buffer::{BufferResource, BufferUsage};
use cartograph_core::gfx::command::{CommandEncoder, RenderPass, RenderPassDescriptor, UploadPass};
use cartograph_core::gfx::error::{RenderError, ResourceError};
use cartograph_core::gfx::renderable::Renderable;
use cartograph_core::gfx::state::{ContextState, ScissorRect, Viewport};
use cartograph_core::gfx::types::Size;
use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

type CommandSink = Arc<Mutex<Vec<wgpu::CommandBuffer>>>;

/// Records buffer creation and updates for one frame.
pub struct WgpuUploadPass {
    device: Arc<WgpuDevice>,
    encoder: Option<wgpu::CommandEncoder>,
    sink: CommandSink,
    debug_depth: usize,
}

impl WgpuUploadPass {
    fn new(device: Arc<WgpuDevice>, name: &str, sink: CommandSink) -> Self {
        let encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(name) });
        Self {
            device,
            encoder: Some(encoder),
            sink,
            debug_depth: 0,
        }
    }
}

impl UploadPass for WgpuUploadPass {
    fn create_buffer(
        &mut self,
        label: &str,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Arc<dyn BufferResource>, ResourceError> {
        Ok(Arc::new(WgpuBuffer::new(
            self.device.clone(),
            label,
            data,
            usage,
        )))
    }

    fn update_buffer(
        &mut self,
        buffer: &dyn BufferResource,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let buffer = buffer
            .as_any()
            .downcast_ref::<WgpuBuffer>()
            .ok_or_else(|| {
                ResourceError::BackendError("buffer was not created by the wgpu backend".into())
            })?;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| ResourceError::BackendError("upload pass already finished".into()))?;
        buffer.record_write(encoder, data)
    }

    fn push_debug_group(&mut self, name: &str) {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.push_debug_group(name);
            self.debug_depth += 1;
        }
    }

    fn pop_debug_group(&mut self) {
        if self.debug_depth == 0 {
            log::warn!("Unbalanced debug group pop in upload pass");
            return;
        }
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.pop_debug_group();
            self.debug_depth -= 1;
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for WgpuUploadPass {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            for _ in 0..self.debug_depth {
                encoder.pop_debug_group();
            }
            self.sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(encoder.finish());
        }
    }
}

/// Records draws into the frame's color and depth attachments.
///
/// Viewport and scissor go through the context's state cache, so repeated
/// identical values are not re-recorded.
pub struct WgpuRenderPass {
    pass: wgpu::RenderPass<'static>,
    descriptor: RenderPassDescriptor,
    state: Arc<Mutex<ContextState>>,
    format: wgpu::TextureFormat,
    size: Size,
    debug_depth: usize,
}

impl WgpuRenderPass {
    /// The native pass, for drawables.
    pub fn native_mut(&mut self) -> &mut wgpu::RenderPass<'static> {
        &mut self.pass
    }

    /// Format pipelines must target in this pass.
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Size of the attachments.
    pub fn size(&self) -> Size {
        self.size
    }
}

impl RenderPass for WgpuRenderPass {
    fn descriptor(&self) -> &RenderPassDescriptor {
        &self.descriptor
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        let width = self.size.width as f32;
        let height = self.size.height as f32;
        let x = viewport.x.clamp(0.0, width);
        let y = viewport.y.clamp(0.0, height);
        let clamped = Viewport {
            x,
            y,
            width: viewport.width.clamp(0.0, width - x),
            height: viewport.height.clamp(0.0, height - y),
        };
        let pass = &mut self.pass;
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .viewport
            .set(clamped, |v| {
                pass.set_viewport(v.x, v.y, v.width, v.height, 0.0, 1.0)
            });
    }

    fn set_scissor(&mut self, rect: ScissorRect) {
        let x = rect.x.min(self.size.width);
        let y = rect.y.min(self.size.height);
        let clamped = ScissorRect {
            x,
            y,
            width: rect.width.min(self.size.width - x),
            height: rect.height.min(self.size.height - y),
        };
        let pass = &mut self.pass;
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .scissor
            .set(clamped, |r| pass.set_scissor_rect(r.x, r.y, r.width, r.height));
    }

    fn push_debug_group(&mut self, name: &str) {
        self.pass.push_debug_group(name);
        self.debug_depth += 1;
    }

    fn pop_debug_group(&mut self) {
        if self.debug_depth == 0 {
            log::warn!("Unbalanced debug group pop in render pass");
            return;
        }
        self.pass.pop_debug_group();
        self.debug_depth -= 1;
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for WgpuRenderPass {
    fn drop(&mut self) {
        for _ in 0..self.debug_depth {
            self.pass.pop_debug_group();
        }
    }
}

/// Records one frame.
///
/// The default renderable is acquired by the first render pass and presented
/// on submit. Dropping the encoder without submitting discards the frame.
pub struct WgpuCommandEncoder {
    device: Arc<WgpuDevice>,
    renderable: Arc<WgpuRenderable>,
    state: Arc<Mutex<ContextState>>,
    encoder: Option<wgpu::CommandEncoder>,
    uploads: CommandSink,
    frame: Option<AcquiredFrame>,
    debug_depth: usize,
}

impl WgpuCommandEncoder {
    pub(crate) fn new(
        device: Arc<WgpuDevice>,
        renderable: Arc<WgpuRenderable>,
        state: Arc<Mutex<ContextState>>,
    ) -> Self {
        let encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        Self {
            device,
            renderable,
            state,
            encoder: Some(encoder),
            uploads: Arc::new(Mutex::new(Vec::new())),
            frame: None,
            debug_depth: 0,
        }
    }
}

impl CommandEncoder for WgpuCommandEncoder {
    fn create_upload_pass(&mut self, name: &str) -> Box<dyn UploadPass + '_> {
        Box::new(WgpuUploadPass::new(
            self.device.clone(),
            name,
            self.uploads.clone(),
        ))
    }

    fn create_render_pass(
        &mut self,
        name: &str,
        descriptor: RenderPassDescriptor,
    ) -> Result<Box<dyn RenderPass + '_>, RenderError> {
        self.device.check_alive()?;
        if self.frame.is_none() {
            self.frame = Some(self.renderable.acquire()?);
        }
        let (Some(frame), Some(encoder)) = (self.frame.as_ref(), self.encoder.as_mut()) else {
            return Err(RenderError::SurfaceAcquisitionFailed(
                "encoder already submitted".to_string(),
            ));
        };

        let color_load = match descriptor.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = descriptor
            .clear_depth
            .map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);
        let stencil_load = descriptor
            .clear_stencil
            .map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);

        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(name),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &frame.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: stencil_load,
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();

        {
            // A new pass starts with the API defaults.
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.viewport.set_dirty();
            state.scissor.set_dirty();
            state.framebuffer.set(frame.binding, |binding| {
                log::trace!("Render pass '{}' bound to target {:?}", name, binding)
            });
        }

        Ok(Box::new(WgpuRenderPass {
            pass,
            descriptor,
            state: self.state.clone(),
            format: frame.format,
            size: self.renderable.size(),
            debug_depth: 0,
        }))
    }

    fn push_debug_group(&mut self, name: &str) {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.push_debug_group(name);
            self.debug_depth += 1;
        }
    }

    fn pop_debug_group(&mut self) {
        if self.debug_depth == 0 {
            log::warn!("Unbalanced debug group pop in command encoder");
            return;
        }
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.pop_debug_group();
            self.debug_depth -= 1;
        }
    }

    fn submit(mut self: Box<Self>) -> Result<(), RenderError> {
        self.device.check_alive()?;

        let mut buffers = std::mem::take(
            &mut *self.uploads.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if let Some(mut encoder) = self.encoder.take() {
            for _ in 0..self.debug_depth {
                encoder.pop_debug_group();
            }
            buffers.push(encoder.finish());
        }
        log::trace!("Submitting {} command buffers", buffers.len());
        self.device.queue().submit(buffers);

        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        self.device.poll_non_blocking();
        Ok(())
    }
}
