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


//! Two-dimensional textures.

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;
use cartograph_core::gfx::error::ResourceError;
use cartograph_core::gfx::texture::{validate_upload, Texture2D};
use cartograph_core::gfx::types::{
    Rect, SamplerState, Size, TextureChannelDataType, TexturePixelType,
};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bytes: u64,
}

#[derive(Debug)]
struct TextureState {
    sampler_state: SamplerState,
    pixel_type: TexturePixelType,
    channel_type: TextureChannelDataType,
    size: Size,
    gpu: Option<GpuTexture>,
    sampler: Option<wgpu::Sampler>,
}

/// A texture whose GPU storage is (re)allocated on demand.
#[derive(Debug)]
pub struct WgpuTexture2D {
    device: Arc<WgpuDevice>,
    label: String,
    state: Mutex<TextureState>,
}

impl WgpuTexture2D {
    /// Creates an unallocated RGBA texture.
    pub fn new(device: Arc<WgpuDevice>) -> Self {
        let label = format!("texture#{}", device.next_id());
        Self {
            device,
            label,
            state: Mutex::new(TextureState {
                sampler_state: SamplerState::default(),
                pixel_type: TexturePixelType::Rgba,
                channel_type: TextureChannelDataType::UnsignedByte,
                size: Size::default(),
                gpu: None,
                sampler: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TextureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the view and sampler to bind, or `None` before `create`.
    pub fn binding(&self) -> Option<(wgpu::TextureView, wgpu::Sampler)> {
        let mut state = self.lock();
        let view = state.gpu.as_ref()?.view.clone();
        if state.sampler.is_none() {
            let sampler_state = state.sampler_state;
            state.sampler = Some(self.create_sampler(sampler_state));
        }
        state.sampler.clone().map(|sampler| (view, sampler))
    }

    fn create_sampler(&self, sampler: SamplerState) -> wgpu::Sampler {
        let filter: wgpu::FilterMode = sampler.filter.into_wgpu();
        self.device.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&self.label),
            address_mode_u: sampler.wrap_u.into_wgpu(),
            address_mode_v: sampler.wrap_v.into_wgpu(),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            anisotropy_clamp: 1,
            border_color: None,
        })
    }

    fn release(&self, state: &mut TextureState) {
        if let Some(gpu) = state.gpu.take() {
            self.device.stats().texture_released(gpu.bytes);
            log::trace!("Released GPU storage of '{}'", self.label);
        }
    }

    fn format(state: &TextureState) -> Result<wgpu::TextureFormat, ResourceError> {
        let format: Option<wgpu::TextureFormat> =
            (state.pixel_type, state.channel_type).into_wgpu();
        format.ok_or_else(|| {
            ResourceError::BackendError(format!(
                "unsupported texture layout {:?}/{:?}",
                state.pixel_type, state.channel_type
            ))
        })
    }

    fn allocate(&self, state: &mut TextureState) -> Result<(), ResourceError> {
        if state.size.is_empty() {
            return Err(ResourceError::InvalidSize {
                width: state.size.width,
                height: state.size.height,
            });
        }
        let limit = self.device.device.limits().max_texture_dimension_2d;
        if state.size.width > limit || state.size.height > limit {
            return Err(ResourceError::InvalidSize {
                width: state.size.width,
                height: state.size.height,
            });
        }
        let format = Self::format(state)?;
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if matches!(
            state.pixel_type,
            TexturePixelType::Depth | TexturePixelType::Stencil
        ) {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }

        self.release(state);
        let texture = self.device.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&self.label),
            size: state.size.into_wgpu(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bytes = (state.size.area()
            * state.pixel_type.channels()
            * state.channel_type.bytes()) as u64;
        self.device.stats().texture_created(bytes);
        log::debug!(
            "Created texture '{}' ({}x{}, {:?})",
            self.label,
            state.size.width,
            state.size.height,
            format
        );
        state.gpu = Some(GpuTexture {
            texture,
            view,
            bytes,
        });
        Ok(())
    }

    fn write(
        &self,
        state: &TextureState,
        pixels: &[u8],
        region: Rect,
    ) -> Result<(), ResourceError> {
        let gpu = state
            .gpu
            .as_ref()
            .ok_or_else(|| ResourceError::NotCreated(self.label.clone()))?;
        let stride = state.pixel_type.channels() * state.channel_type.bytes();
        self.device.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: 0,
                origin: region.into_wgpu(),
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.w * stride as u32),
                rows_per_image: Some(region.h),
            },
            region.size().into_wgpu(),
        );
        Ok(())
    }
}

impl Texture2D for WgpuTexture2D {
    fn set_sampler_configuration(&self, sampler: SamplerState) {
        let mut state = self.lock();
        if state.sampler_state != sampler {
            state.sampler_state = sampler;
            state.sampler = None;
        }
    }

    fn sampler_configuration(&self) -> SamplerState {
        self.lock().sampler_state
    }

    fn set_format(&self, pixel_type: TexturePixelType, channel_type: TextureChannelDataType) {
        let mut state = self.lock();
        if state.pixel_type != pixel_type || state.channel_type != channel_type {
            state.pixel_type = pixel_type;
            state.channel_type = channel_type;
            self.release(&mut state);
        }
    }

    fn set_size(&self, size: Size) {
        let mut state = self.lock();
        if state.size != size {
            state.size = size;
            self.release(&mut state);
        }
    }

    fn size(&self) -> Size {
        self.lock().size
    }

    fn pixel_type(&self) -> TexturePixelType {
        self.lock().pixel_type
    }

    fn channel_type(&self) -> TextureChannelDataType {
        self.lock().channel_type
    }

    fn create(&self) -> Result<(), ResourceError> {
        let mut state = self.lock();
        self.allocate(&mut state)
    }

    fn is_created(&self) -> bool {
        self.lock().gpu.is_some()
    }

    fn upload(&self, pixels: &[u8]) -> Result<(), ResourceError> {
        let size = self.size();
        validate_upload(self, pixels, size)?;
        let mut state = self.lock();
        if state.gpu.is_none() {
            self.allocate(&mut state)?;
        }
        self.write(&state, pixels, Rect::new(0, 0, size.width, size.height))
    }

    fn upload_sub_region(&self, pixels: &[u8], region: Rect) -> Result<(), ResourceError> {
        validate_upload(self, pixels, region.size())?;
        let state = self.lock();
        if !region.fits_in(state.size) {
            return Err(ResourceError::InvalidSize {
                width: region.x + region.w,
                height: region.y + region.h,
            });
        }
        self.write(&state, pixels, region)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for WgpuTexture2D {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(gpu) = state.gpu.take() {
            self.device.stats().texture_released(gpu.bytes);
        }
    }
}
