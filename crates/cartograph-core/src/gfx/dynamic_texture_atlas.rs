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

//! Distributes image batches over a growing list of dynamic textures.

use super::context::Context;
use super::dynamic_texture::{DynamicTexture, TextureHandle};
use super::error::ResourceError;
use super::image::Image;
use super::types::{Rect, Size, TexturePixelType};
use crate::config::AtlasConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One image to place in an atlas.
#[derive(Debug, Clone, Copy)]
pub struct ImageRequest<'a> {
    /// Stable identifier; the same id shares one region.
    pub id: u32,
    /// Tightly packed pixels of `size`.
    pub pixels: &'a [u8],
    /// Image size without padding.
    pub size: Size,
}

/// Where one image of a batch ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePosition {
    /// Image identifier.
    pub id: u32,
    /// The image pixels inside the atlas, padding excluded.
    pub rect: Rect,
}

/// The result of placing a batch: every image lives in the same texture.
#[derive(Debug, Clone)]
pub struct AtlasBatch {
    /// The atlas holding the batch.
    pub texture: Arc<DynamicTexture>,
    /// Handles to release with [`DynamicTextureAtlas::remove_images`].
    pub handles: Vec<TextureHandle>,
    /// Image positions, in request order.
    pub positions: Vec<ImagePosition>,
}

struct Inner {
    textures: Vec<Arc<DynamicTexture>>,
    dummies: HashMap<TexturePixelType, Arc<DynamicTexture>>,
}

/// Owns the dynamic textures of a renderer, per pixel type.
///
/// A batch is placed entirely in one atlas. Existing atlases are tried first;
/// otherwise a new one is created, starting at the configured initial size and
/// doubling up to the maximum.
pub struct DynamicTextureAtlas {
    config: AtlasConfig,
    defer_upload: bool,
    inner: Mutex<Inner>,
}

impl fmt::Debug for DynamicTextureAtlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTextureAtlas")
            .field("config", &self.config)
            .field("defer_upload", &self.defer_upload)
            .field("textures", &self.lock().textures.len())
            .finish()
    }
}

impl DynamicTextureAtlas {
    /// Creates an empty atlas manager.
    pub fn new(config: AtlasConfig, defer_upload: bool) -> Self {
        Self {
            config,
            defer_upload,
            inner: Mutex::new(Inner {
                textures: Vec::new(),
                dummies: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live atlases holding `pixel_type` images.
    pub fn texture_count(&self, pixel_type: TexturePixelType) -> usize {
        self.lock()
            .textures
            .iter()
            .filter(|t| t.pixel_type() == pixel_type)
            .count()
    }

    /// A 1x1 texture of `pixel_type`, bound where a drawable expects an atlas
    /// but has no images.
    pub fn dummy_texture(
        &self,
        context: &dyn Context,
        pixel_type: TexturePixelType,
    ) -> Result<Arc<DynamicTexture>, ResourceError> {
        let mut inner = self.lock();
        Self::dummy_locked(&mut inner, context, pixel_type, self.defer_upload)
    }

    fn dummy_locked(
        inner: &mut Inner,
        context: &dyn Context,
        pixel_type: TexturePixelType,
        defer_upload: bool,
    ) -> Result<Arc<DynamicTexture>, ResourceError> {
        if let Some(dummy) = inner.dummies.get(&pixel_type) {
            return Ok(dummy.clone());
        }
        let dummy = Arc::new(DynamicTexture::new(
            context,
            Size::new(1, 1),
            pixel_type,
            defer_upload,
        )?);
        inner.dummies.insert(pixel_type, dummy.clone());
        Ok(dummy)
    }

    /// Reserves every image of `images` in a single atlas and uploads the new ones.
    ///
    /// An empty batch gets the dummy texture. Fails with
    /// [`ResourceError::AtlasFull`] when the batch does not fit even in a new
    /// atlas of the maximum size.
    pub fn add_images(
        &self,
        context: &dyn Context,
        pixel_type: TexturePixelType,
        images: &[ImageRequest<'_>],
    ) -> Result<AtlasBatch, ResourceError> {
        let mut inner = self.lock();
        if images.is_empty() {
            let texture = Self::dummy_locked(&mut inner, context, pixel_type, self.defer_upload)?;
            return Ok(AtlasBatch {
                texture,
                handles: Vec::new(),
                positions: Vec::new(),
            });
        }

        let padding = self.config.padding;
        let padded: Vec<Size> = images
            .iter()
            .map(|img| Size::new(img.size.width + 2 * padding, img.size.height + 2 * padding))
            .collect();

        let existing: Vec<Arc<DynamicTexture>> = inner
            .textures
            .iter()
            .filter(|t| t.pixel_type() == pixel_type)
            .cloned()
            .collect();
        let mut placed = existing
            .into_iter()
            .find_map(|texture| Self::reserve_all(&texture, images, &padded).map(|h| (texture, h)));

        if placed.is_none() {
            let mut edge = self.config.initial_size;
            while edge <= self.config.max_size {
                let texture = Arc::new(DynamicTexture::new(
                    context,
                    Size::new(edge, edge),
                    pixel_type,
                    self.defer_upload,
                )?);
                if let Some(handles) = Self::reserve_all(&texture, images, &padded) {
                    inner.textures.push(texture.clone());
                    placed = Some((texture, handles));
                    break;
                }
                edge = edge.saturating_mul(2);
            }
        }

        let Some((texture, handles)) = placed else {
            log::warn!(
                "{} images do not fit in a {}x{} atlas",
                images.len(),
                self.config.max_size,
                self.config.max_size
            );
            return Err(ResourceError::AtlasFull {
                width: self.config.max_size,
                height: self.config.max_size,
            });
        };

        let positions = match Self::upload_all(&texture, pixel_type, padding, images, &handles) {
            Ok(positions) => positions,
            Err(e) => {
                for handle in &handles {
                    texture.remove_texture(handle);
                }
                if texture.is_empty() {
                    inner.textures.retain(|t| !Arc::ptr_eq(t, &texture));
                }
                log::error!("Failed to upload a batch of {} images: {}", images.len(), e);
                return Err(e);
            }
        };

        Ok(AtlasBatch {
            texture,
            handles,
            positions,
        })
    }

    fn upload_all(
        texture: &DynamicTexture,
        pixel_type: TexturePixelType,
        padding: u32,
        images: &[ImageRequest<'_>],
        handles: &[TextureHandle],
    ) -> Result<Vec<ImagePosition>, ResourceError> {
        let mut positions = Vec::with_capacity(images.len());
        for (image, handle) in images.iter().zip(handles) {
            if handle.needs_upload() {
                let padded_image = Image::padded(image.pixels, image.size, pixel_type, padding)
                    .ok_or(ResourceError::SizeMismatch {
                        expected: image.size.area() * pixel_type.channels(),
                        actual: image.pixels.len(),
                    })?;
                texture.upload_image(padded_image.data(), handle)?;
            }
            let rect = handle.rectangle();
            positions.push(ImagePosition {
                id: image.id,
                rect: Rect::new(rect.x + padding, rect.y + padding, image.size.width, image.size.height),
            });
        }
        Ok(positions)
    }

    /// Reserves every image or nothing.
    fn reserve_all(
        texture: &DynamicTexture,
        images: &[ImageRequest<'_>],
        padded: &[Size],
    ) -> Option<Vec<TextureHandle>> {
        let mut handles = Vec::with_capacity(images.len());
        for (image, size) in images.iter().zip(padded) {
            match texture.reserve_size(*size, Some(image.id)) {
                Some(handle) => handles.push(handle),
                None => {
                    for handle in &handles {
                        texture.remove_texture(handle);
                    }
                    return None;
                }
            }
        }
        Some(handles)
    }

    /// Releases `handles` from `texture` and drops the atlas once it is empty.
    pub fn remove_images(&self, handles: &[TextureHandle], texture: &Arc<DynamicTexture>) {
        let mut inner = self.lock();
        for handle in handles {
            texture.remove_texture(handle);
        }
        if texture.is_empty() {
            let before = inner.textures.len();
            inner.textures.retain(|t| !Arc::ptr_eq(t, texture));
            if inner.textures.len() < before {
                log::debug!("Dropped empty {:?} atlas", texture.pixel_type());
            }
        }
    }

    /// Flushes the pending uploads of every atlas. Render thread only.
    pub fn upload_deferred_images(&self) -> Result<usize, ResourceError> {
        let inner = self.lock();
        let mut uploaded = 0;
        for texture in inner.textures.iter().chain(inner.dummies.values()) {
            uploaded += texture.upload_deferred_images()?;
        }
        Ok(uploaded)
    }
}
