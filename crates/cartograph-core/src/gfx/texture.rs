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

//! Defines the two-dimensional texture contract.

use super::error::ResourceError;
use super::types::{Rect, SamplerState, Size, TextureChannelDataType, TexturePixelType};
use std::any::Any;
use std::fmt::Debug;

/// A GPU texture owned by a single creator (a dynamic atlas, a drawable or a
/// render target) and shared with drawables by `Arc`.
///
/// The lifecycle is: created empty by
/// [`Context::create_texture_2d`](crate::gfx::context::Context::create_texture_2d),
/// configured with [`set_format`](Texture2D::set_format) and
/// [`set_size`](Texture2D::set_size), allocated with [`create`](Texture2D::create),
/// then filled with [`upload`](Texture2D::upload) or
/// [`upload_sub_region`](Texture2D::upload_sub_region).
///
/// Methods take `&self`; implementations keep their mutable state behind a lock
/// so a texture can be shared between an atlas and the drawables sampling it.
pub trait Texture2D: Send + Sync + Debug {
    /// Replaces the sampler configuration.
    fn set_sampler_configuration(&self, sampler: SamplerState);

    /// Returns the sampler configuration.
    fn sampler_configuration(&self) -> SamplerState;

    /// Sets the pixel layout. Changing it after `create` releases the GPU storage.
    fn set_format(&self, pixel_type: TexturePixelType, channel_type: TextureChannelDataType);

    /// Sets the size. Changing it after `create` releases the GPU storage.
    fn set_size(&self, size: Size);

    /// Current size.
    fn size(&self) -> Size;

    /// Current channel layout.
    fn pixel_type(&self) -> TexturePixelType;

    /// Current channel storage type.
    fn channel_type(&self) -> TextureChannelDataType;

    /// Allocates GPU storage for the configured size and format.
    fn create(&self) -> Result<(), ResourceError>;

    /// Returns `true` once GPU storage exists.
    fn is_created(&self) -> bool;

    /// Replaces the full contents of the texture, creating it first if needed.
    fn upload(&self, pixels: &[u8]) -> Result<(), ResourceError>;

    /// Replaces the pixels of `region`. `pixels` is tightly packed for the region size.
    fn upload_sub_region(&self, pixels: &[u8], region: Rect) -> Result<(), ResourceError>;

    /// Allows the owning backend to recover its concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Bytes per pixel.
    fn pixel_stride(&self) -> usize {
        self.pixel_type().channels() * self.channel_type().bytes()
    }

    /// Total bytes of one full upload.
    fn data_size(&self) -> usize {
        self.size().area() * self.pixel_stride()
    }
}

/// Checks that `pixels` holds exactly one tightly packed image of `size`.
pub fn validate_upload(
    texture: &dyn Texture2D,
    pixels: &[u8],
    size: Size,
) -> Result<(), ResourceError> {
    if size.is_empty() {
        return Err(ResourceError::InvalidSize {
            width: size.width,
            height: size.height,
        });
    }
    let expected = size.area() * texture.pixel_stride();
    if pixels.len() != expected {
        return Err(ResourceError::SizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}
