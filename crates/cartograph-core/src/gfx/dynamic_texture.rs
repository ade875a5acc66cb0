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

//! A texture atlas shared by many small images.
//!
//! Regions are handed out by a [`ShelfPacker`] and reference counted by image id.
//! A single mutex guards the packer and the pending uploads: images are added
//! from tile workers while the render thread flushes and removes them.

use super::context::Context;
use super::error::ResourceError;
use super::shelf_pack::ShelfPacker;
use super::texture::Texture2D;
use super::types::{
    Rect, SamplerState, Size, TextureChannelDataType, TextureFilterType, TexturePixelType,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A view into a [`DynamicTexture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureHandle {
    id: u32,
    rect: Rect,
    needs_upload: bool,
}

impl TextureHandle {
    /// Bin identifier inside the atlas.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Region of the atlas, in pixels.
    pub fn rectangle(&self) -> Rect {
        self.rect
    }

    /// `false` when the image was already resident and its pixels are reused.
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }
}

struct PendingUpload {
    /// `None` for debug zero fills of freed regions.
    id: Option<u32>,
    rect: Rect,
    pixels: Vec<u8>,
}

struct Inner {
    packer: ShelfPacker,
    pending: Vec<PendingUpload>,
}

/// A shelf-packed texture with reference-counted regions.
///
/// The atlas never grows: when [`add_image`](Self::add_image) returns `None` the
/// caller has to use another atlas.
pub struct DynamicTexture {
    texture: Arc<dyn Texture2D>,
    pixel_type: TexturePixelType,
    defer_upload: bool,
    inner: Mutex<Inner>,
}

impl fmt::Debug for DynamicTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTexture")
            .field("size", &self.size())
            .field("pixel_type", &self.pixel_type)
            .field("defer_upload", &self.defer_upload)
            .finish()
    }
}

impl DynamicTexture {
    /// Creates an atlas of `size`.
    ///
    /// With `defer_upload`, pixels are queued until
    /// [`upload_deferred_images`](Self::upload_deferred_images) runs on the render
    /// thread, and the GPU texture itself is only allocated then.
    pub fn new(
        context: &dyn Context,
        size: Size,
        pixel_type: TexturePixelType,
        defer_upload: bool,
    ) -> Result<Self, ResourceError> {
        if size.is_empty() {
            return Err(ResourceError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }
        let texture = context.create_texture_2d();
        texture.set_format(pixel_type, TextureChannelDataType::UnsignedByte);
        texture.set_size(size);
        texture.set_sampler_configuration(SamplerState {
            filter: TextureFilterType::Linear,
            ..Default::default()
        });
        if !defer_upload {
            texture.create()?;
        }
        log::debug!(
            "Created {}x{} {:?} dynamic texture",
            size.width,
            size.height,
            pixel_type
        );
        Ok(Self {
            texture,
            pixel_type,
            defer_upload,
            inner: Mutex::new(Inner {
                packer: ShelfPacker::new(size),
                pending: Vec::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The backing texture, for binding to drawables.
    pub fn texture(&self) -> &Arc<dyn Texture2D> {
        &self.texture
    }

    /// Channel layout of every image in the atlas.
    pub fn pixel_type(&self) -> TexturePixelType {
        self.pixel_type
    }

    /// Atlas size.
    pub fn size(&self) -> Size {
        self.texture.size()
    }

    /// Returns `true` when no region is reserved.
    pub fn is_empty(&self) -> bool {
        self.lock().packer.is_empty()
    }

    /// Number of reserved regions.
    pub fn region_count(&self) -> usize {
        self.lock().packer.len()
    }

    /// Number of uploads waiting for the render thread.
    pub fn pending_upload_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Reserves a region without uploading.
    pub fn reserve_size(&self, size: Size, unique_id: Option<u32>) -> Option<TextureHandle> {
        self.add_image(None, size, unique_id)
    }

    /// Reserves a region of `size` and uploads `pixels` into it.
    ///
    /// If `unique_id` is already resident its refcount is incremented and the
    /// returned handle has `needs_upload() == false`; `pixels` is ignored then.
    /// Returns `None` when the atlas has no room.
    pub fn add_image(
        &self,
        pixels: Option<&[u8]>,
        size: Size,
        unique_id: Option<u32>,
    ) -> Option<TextureHandle> {
        let mut inner = self.lock();
        let resident = unique_id.is_some_and(|id| inner.packer.get_bin(id).is_some());
        let bin = inner.packer.pack_one(size.width, size.height, unique_id)?;
        let handle = TextureHandle {
            id: bin.id,
            rect: bin.rect,
            needs_upload: !resident,
        };
        if handle.needs_upload {
            if let Some(pixels) = pixels {
                if let Err(e) = self.upload_locked(&mut inner, pixels, &handle) {
                    log::error!("Failed to upload image {} into atlas: {}", handle.id, e);
                    inner.packer.unref(handle.id);
                    return None;
                }
            }
        }
        Some(handle)
    }

    /// Uploads `pixels` into the region of `handle`.
    pub fn upload_image(&self, pixels: &[u8], handle: &TextureHandle) -> Result<(), ResourceError> {
        let mut inner = self.lock();
        self.upload_locked(&mut inner, pixels, handle)
    }

    fn upload_locked(
        &self,
        inner: &mut Inner,
        pixels: &[u8],
        handle: &TextureHandle,
    ) -> Result<(), ResourceError> {
        let expected = handle.rect.size().area() * self.texture.pixel_stride();
        if pixels.len() != expected {
            return Err(ResourceError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        if self.defer_upload {
            inner.pending.retain(|p| p.id != Some(handle.id));
            inner.pending.push(PendingUpload {
                id: Some(handle.id),
                rect: handle.rect,
                pixels: pixels.to_vec(),
            });
            Ok(())
        } else {
            self.texture.upload_sub_region(pixels, handle.rect)
        }
    }

    /// Releases one reference to the region of `handle`.
    ///
    /// Returns `true` when this was the last reference and the region was freed.
    pub fn remove_texture(&self, handle: &TextureHandle) -> bool {
        let mut inner = self.lock();
        match inner.packer.unref(handle.id) {
            Some(0) => {
                inner.pending.retain(|p| p.id != Some(handle.id));
                if cfg!(debug_assertions) {
                    self.zero_region(&mut inner, handle.rect);
                }
                true
            }
            Some(_) => false,
            None => {
                log::warn!("Removing unknown atlas region {}", handle.id);
                false
            }
        }
    }

    fn zero_region(&self, inner: &mut Inner, rect: Rect) {
        let zeros = vec![0u8; rect.size().area() * self.texture.pixel_stride()];
        if self.defer_upload {
            inner.pending.push(PendingUpload {
                id: None,
                rect,
                pixels: zeros,
            });
        } else if self.texture.is_created() {
            if let Err(e) = self.texture.upload_sub_region(&zeros, rect) {
                log::warn!("Failed to clear freed atlas region: {}", e);
            }
        }
    }

    /// Flushes queued uploads in submission order. Must run on the render thread
    /// before any drawable sampling this atlas is drawn.
    ///
    /// The GPU texture is allocated here if it does not exist yet, even with
    /// nothing queued. On error the failed upload and every later one stay
    /// queued for the next flush.
    ///
    /// Returns the number of regions uploaded.
    pub fn upload_deferred_images(&self) -> Result<usize, ResourceError> {
        let mut inner = self.lock();
        if !self.texture.is_created() {
            self.texture.create()?;
        }
        let mut uploaded = 0;
        let mut result = Ok(());
        for upload in &inner.pending {
            if let Err(e) = self.texture.upload_sub_region(&upload.pixels, upload.rect) {
                result = Err(e);
                break;
            }
            uploaded += 1;
        }
        inner.pending.drain(..uploaded);
        result.map(|()| uploaded)
    }
}
