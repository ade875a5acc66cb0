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


//! The default render target: a window surface or an offscreen texture.

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;
use cartograph_core::gfx::error::RenderError;
use cartograph_core::gfx::renderable::Renderable;
use cartograph_core::gfx::state::FramebufferBinding;
use cartograph_core::gfx::types::Size;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Format of the depth-stencil attachment of every render pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Format of offscreen targets.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

enum Target {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: Option<wgpu::Texture>,
    },
}

struct TargetState {
    target: Target,
    size: Size,
    needs_configure: bool,
    depth: Option<(Size, wgpu::TextureView)>,
}

/// The target of one frame, released by presenting or dropping it.
pub struct AcquiredFrame {
    /// Color attachment.
    pub view: wgpu::TextureView,
    /// Depth-stencil attachment.
    pub depth_view: wgpu::TextureView,
    /// Color format the pipelines must target.
    pub format: wgpu::TextureFormat,
    /// Identity of the target, for the framebuffer state cache.
    pub binding: FramebufferBinding,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredFrame {
    /// Shows the frame if it came from a surface.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

/// Where the backend draws by default.
pub struct WgpuRenderable {
    id: u64,
    format: wgpu::TextureFormat,
    device: Arc<WgpuDevice>,
    state: Mutex<TargetState>,
}

impl fmt::Debug for WgpuRenderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        let kind = match state.target {
            Target::Surface { .. } => "Surface",
            Target::Offscreen { .. } => "Offscreen",
        };
        f.debug_struct("WgpuRenderable")
            .field("id", &self.id)
            .field("kind", &kind)
            .field("format", &self.format)
            .field("size", &state.size)
            .finish()
    }
}

impl WgpuRenderable {
    /// Wraps a window surface and configures it for `size`.
    pub fn from_surface(
        device: Arc<WgpuDevice>,
        adapter: &wgpu::Adapter,
        surface: wgpu::Surface<'static>,
        size: Size,
    ) -> Self {
        let caps = surface.get_capabilities(adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .unwrap_or(OFFSCREEN_FORMAT);
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            // Fifo is guaranteed to be supported.
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        log::info!(
            "Surface renderable {}x{} with format {:?}",
            config.width,
            config.height,
            format
        );
        Self {
            id: device.next_id(),
            format,
            device,
            state: Mutex::new(TargetState {
                target: Target::Surface { surface, config },
                size,
                needs_configure: true,
                depth: None,
            }),
        }
    }

    /// Creates an offscreen target of `size`.
    pub fn offscreen(device: Arc<WgpuDevice>, size: Size) -> Self {
        log::info!("Offscreen renderable {}x{}", size.width, size.height);
        Self {
            id: device.next_id(),
            format: OFFSCREEN_FORMAT,
            device,
            state: Mutex::new(TargetState {
                target: Target::Offscreen { texture: None },
                size,
                needs_configure: true,
                depth: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TargetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Color format of the target.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// The render target binding of this renderable.
    pub fn binding(&self) -> FramebufferBinding {
        FramebufferBinding(self.id)
    }

    /// Acquires the color and depth attachments of the next frame.
    pub fn acquire(&self) -> Result<AcquiredFrame, RenderError> {
        let mut state = self.lock();
        let size = state.size;
        if size.is_empty() {
            return Err(RenderError::SurfaceAcquisitionFailed(format!(
                "renderable has an empty size {}x{}",
                size.width, size.height
            )));
        }
        let needs_configure = std::mem::take(&mut state.needs_configure);

        let (view, surface_texture) = match &mut state.target {
            Target::Surface { surface, config } => {
                if needs_configure {
                    config.width = size.width;
                    config.height = size.height;
                    surface.configure(&self.device.device, config);
                }
                let texture = self.acquire_surface_texture(surface, config)?;
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                (view, Some(texture))
            }
            Target::Offscreen { texture } => {
                if needs_configure || texture.is_none() {
                    *texture = Some(self.create_attachment(size, self.format, "offscreen color"));
                }
                let view = texture
                    .as_ref()
                    .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
                    .ok_or_else(|| {
                        RenderError::SurfaceAcquisitionFailed("offscreen target missing".into())
                    })?;
                (view, None)
            }
        };

        let depth_view = match &state.depth {
            Some((depth_size, view)) if *depth_size == size => view.clone(),
            _ => {
                let view = self
                    .create_attachment(size, DEPTH_FORMAT, "depth stencil")
                    .create_view(&wgpu::TextureViewDescriptor::default());
                state.depth = Some((size, view.clone()));
                view
            }
        };

        Ok(AcquiredFrame {
            view,
            depth_view,
            format: self.format,
            binding: self.binding(),
            surface_texture,
        })
    }

    /// Copies the offscreen color target back as tightly packed RGBA rows.
    ///
    /// Returns `None` for surface targets and before the first frame was drawn.
    /// Blocks until the GPU finished every submitted frame.
    pub fn read_pixels(&self) -> Result<Option<Vec<u8>>, RenderError> {
        let state = self.lock();
        let Target::Offscreen {
            texture: Some(texture),
        } = &state.target
        else {
            return Ok(None);
        };
        let size = state.size;
        let row_bytes = size.width * 4;
        let padded_row = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let buffer = self.device.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen readback"),
            size: u64::from(padded_row) * u64::from(size.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("offscreen readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(size.height),
                },
            },
            size.into_wgpu(),
        );
        self.device.queue.submit([encoder.finish()]);

        let slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll_blocking();
        receiver
            .recv()
            .map_err(|e| RenderError::DeviceLost(format!("readback never completed: {e}")))?
            .map_err(|e| RenderError::DeviceLost(format!("readback mapping failed: {e:?}")))?;

        let pixels = {
            let mapped = slice.get_mapped_range();
            mapped
                .chunks(padded_row as usize)
                .flat_map(|row| &row[..row_bytes as usize])
                .copied()
                .collect()
        };
        buffer.unmap();
        Ok(Some(pixels))
    }

    fn acquire_surface_texture(
        &self,
        surface: &wgpu::Surface<'static>,
        config: &wgpu::SurfaceConfiguration,
    ) -> Result<wgpu::SurfaceTexture, RenderError> {
        let mut reconfigured = false;
        loop {
            match surface.get_current_texture() {
                Ok(texture) => return Ok(texture),
                Err(e @ wgpu::SurfaceError::Lost) | Err(e @ wgpu::SurfaceError::Outdated)
                    if !reconfigured =>
                {
                    log::warn!(
                        "Surface lost or outdated ({:?}), reconfiguring at {}x{}",
                        e,
                        config.width,
                        config.height
                    );
                    surface.configure(&self.device.device, config);
                    reconfigured = true;
                }
                Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Surface out of memory ({e:?})");
                    return Err(RenderError::OutOfMemory);
                }
                Err(e @ wgpu::SurfaceError::Timeout) => {
                    log::warn!("Timed out acquiring a surface frame ({e:?})");
                    return Err(RenderError::SurfaceAcquisitionFailed(format!(
                        "Timeout: {e:?}"
                    )));
                }
                Err(e) => {
                    log::error!("Unexpected SurfaceError: {e:?}");
                    return Err(RenderError::SurfaceAcquisitionFailed(format!(
                        "Unexpected SurfaceError: {e:?}"
                    )));
                }
            }
        }
    }

    fn create_attachment(
        &self,
        size: Size,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> wgpu::Texture {
        self.device.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: size.into_wgpu(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }
}

impl Renderable for WgpuRenderable {
    fn size(&self) -> Size {
        self.lock().size
    }

    fn resize(&self, size: Size) {
        let mut state = self.lock();
        if state.size != size {
            log::debug!("Renderable resized to {}x{}", size.width, size.height);
            state.size = size;
            state.needs_configure = true;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
