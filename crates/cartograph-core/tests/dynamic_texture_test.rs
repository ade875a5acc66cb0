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

mod common;

use cartograph_core::gfx::{
    DynamicTexture, DynamicTextureAtlas, ImageRequest, Rect, ResourceError, Size, Texture2D,
    TexturePixelType,
};
use cartograph_core::AtlasConfig;
use common::MockContext;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn rgba(size: Size, value: u8) -> Vec<u8> {
    vec![value; size.area() * 4]
}

fn atlas(context: &MockContext, edge: u32, defer: bool) -> DynamicTexture {
    DynamicTexture::new(context, Size::new(edge, edge), TexturePixelType::Rgba, defer)
        .expect("valid atlas")
}

#[test]
fn test_shared_image_lifecycle() {
    let context = MockContext::new();
    let texture = atlas(&context, 100, false);
    let size = Size::new(10, 10);

    let first = texture
        .add_image(Some(&rgba(size, 1)), size, Some(1))
        .expect("room for the image");
    assert!(first.needs_upload());
    assert!(first.rectangle().fits_in(texture.size()));

    let second = texture
        .add_image(Some(&rgba(size, 2)), size, Some(1))
        .expect("resident image");
    assert!(!second.needs_upload());
    assert_eq!(second.id(), first.id());
    assert_eq!(second.rectangle(), first.rectangle());

    assert!(!texture.remove_texture(&first));
    assert_eq!(texture.region_count(), 1);
    assert!(texture.remove_texture(&second));
    assert!(texture.is_empty());

    let other = texture
        .add_image(Some(&rgba(size, 3)), size, Some(2))
        .expect("freed region is reusable");
    assert!(other.needs_upload());
    assert_eq!(other.rectangle(), first.rectangle());
}

#[test]
fn test_pixels_land_in_their_region() {
    let context = MockContext::new();
    let texture = atlas(&context, 64, false);
    let size = Size::new(4, 4);
    texture.add_image(Some(&rgba(size, 7)), size, Some(1));
    let handle = texture
        .add_image(Some(&rgba(size, 9)), size, Some(2))
        .expect("room");

    let mock = MockContext::mock_texture(texture.texture().as_ref());
    let r = handle.rectangle();
    assert_eq!(mock.pixel_at(r.x, r.y), vec![9; 4]);
    assert_eq!(mock.pixel_at(r.x + 3, r.y + 3), vec![9; 4]);
    assert_eq!(mock.pixel_at(0, 0), vec![7; 4]);
}

#[test]
fn test_freed_region_is_zeroed_in_debug_builds() {
    let context = MockContext::new();
    let texture = atlas(&context, 32, false);
    let size = Size::new(4, 4);
    let handle = texture.add_image(Some(&rgba(size, 5)), size, Some(1)).expect("room");
    texture.remove_texture(&handle);

    let mock = MockContext::mock_texture(texture.texture().as_ref());
    let expected = if cfg!(debug_assertions) { vec![0; 4] } else { vec![5; 4] };
    assert_eq!(mock.pixel_at(0, 0), expected);
}

#[test]
fn test_full_atlas_returns_none() {
    let context = MockContext::new();
    let texture = atlas(&context, 100, false);
    let size = Size::new(60, 60);
    assert!(texture.add_image(Some(&rgba(size, 1)), size, None).is_some());
    assert!(texture.add_image(Some(&rgba(size, 1)), size, None).is_none());
    assert_eq!(texture.region_count(), 1);
}

#[test]
fn test_wrong_pixel_count_is_rejected() {
    let context = MockContext::new();
    let texture = atlas(&context, 32, false);
    let handle = texture.reserve_size(Size::new(4, 4), Some(1)).expect("room");
    let result = texture.upload_image(&[0; 3], &handle);
    assert!(matches!(result, Err(ResourceError::SizeMismatch { expected: 64, actual: 3 })));
}

#[test]
fn test_deferred_uploads_wait_for_render_thread() {
    let context = MockContext::new();
    let texture = atlas(&context, 32, true);
    let size = Size::new(2, 2);
    let handle = texture.add_image(Some(&rgba(size, 4)), size, Some(1)).expect("room");

    let mock = MockContext::mock_texture(texture.texture().as_ref());
    assert!(!mock.is_created());
    assert_eq!(texture.pending_upload_count(), 1);

    assert_eq!(texture.upload_deferred_images().expect("flush"), 1);
    assert_eq!(texture.pending_upload_count(), 0);
    let r = handle.rectangle();
    assert_eq!(mock.pixel_at(r.x + 1, r.y + 1), vec![4; 4]);
}

#[test]
fn test_failed_flush_keeps_remaining_uploads() {
    let context = MockContext::new();
    let texture = atlas(&context, 32, true);
    let size = Size::new(2, 2);
    let handles: Vec<_> = (1..=3u8)
        .map(|i| {
            texture
                .add_image(Some(&rgba(size, i)), size, Some(i as u32))
                .expect("room")
        })
        .collect();

    let mock = MockContext::mock_texture(texture.texture().as_ref());
    *mock.upload_budget.lock().unwrap() = Some(1);
    assert!(matches!(
        texture.upload_deferred_images(),
        Err(ResourceError::BackendError(_))
    ));
    assert_eq!(texture.pending_upload_count(), 2);

    *mock.upload_budget.lock().unwrap() = None;
    assert_eq!(texture.upload_deferred_images().expect("flush"), 2);
    assert_eq!(texture.pending_upload_count(), 0);
    for (i, handle) in handles.iter().enumerate() {
        let r = handle.rectangle();
        assert_eq!(mock.pixel_at(r.x, r.y), vec![i as u8 + 1; 4]);
    }
}

#[test]
fn test_flush_creates_texture_without_pending_uploads() {
    let context = MockContext::new();
    let texture = atlas(&context, 16, true);
    texture.reserve_size(Size::new(4, 4), Some(1)).expect("room");
    assert_eq!(texture.pending_upload_count(), 0);
    assert!(!texture.texture().is_created());

    assert_eq!(texture.upload_deferred_images().expect("flush"), 0);
    assert!(texture.texture().is_created());
}

#[test]
fn test_concurrent_adds_never_overlap() {
    let context = MockContext::new();
    let texture = Arc::new(atlas(&context, 256, true));

    let workers: Vec<_> = (0..4u32)
        .map(|worker| {
            let texture = texture.clone();
            thread::spawn(move || {
                let size = Size::new(8, 8);
                (0..16u32)
                    .filter_map(|i| texture.add_image(Some(&rgba(size, 1)), size, Some(worker * 100 + i)))
                    .map(|h| h.rectangle())
                    .collect::<Vec<Rect>>()
            })
        })
        .collect();
    let rects: Vec<Rect> = workers
        .into_iter()
        .flat_map(|w| w.join().expect("worker"))
        .collect();

    assert_eq!(rects.len(), 64);
    for (i, a) in rects.iter().enumerate() {
        for b in &rects[i + 1..] {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
    assert_eq!(texture.pending_upload_count(), 64);
}

#[test]
fn test_atlas_manager_grows_new_atlases() {
    let context = MockContext::new();
    let manager = DynamicTextureAtlas::new(
        AtlasConfig {
            initial_size: 64,
            max_size: 256,
            padding: 1,
        },
        false,
    );
    let size = Size::new(100, 100);
    let pixels = rgba(size, 3);
    let batch = manager
        .add_images(&context, TexturePixelType::Rgba, &[ImageRequest { id: 1, pixels: &pixels, size }])
        .expect("fits in 128");

    assert_eq!(batch.texture.size(), Size::new(128, 128));
    assert_eq!(manager.texture_count(TexturePixelType::Rgba), 1);
    let position = batch.positions[0];
    assert_eq!(position.rect, Rect::new(1, 1, 100, 100));
    let mock = MockContext::mock_texture(batch.texture.texture().as_ref());
    assert_eq!(mock.pixel_at(0, 0), vec![0; 4]);
    assert_eq!(mock.pixel_at(1, 1), vec![3; 4]);

    manager.remove_images(&batch.handles, &batch.texture);
    assert_eq!(manager.texture_count(TexturePixelType::Rgba), 0);
}

#[test]
fn test_atlas_manager_reports_exhaustion() {
    let context = MockContext::new();
    let manager = DynamicTextureAtlas::new(
        AtlasConfig {
            initial_size: 64,
            max_size: 128,
            padding: 0,
        },
        false,
    );
    let size = Size::new(200, 10);
    let pixels = rgba(size, 1);
    let result = manager.add_images(&context, TexturePixelType::Rgba, &[ImageRequest { id: 1, pixels: &pixels, size }]);
    assert!(matches!(result, Err(ResourceError::AtlasFull { width: 128, height: 128 })));
}

#[test]
fn test_batches_are_all_or_nothing() {
    let context = MockContext::new();
    let manager = DynamicTextureAtlas::new(
        AtlasConfig {
            initial_size: 64,
            max_size: 128,
            padding: 0,
        },
        false,
    );
    let small = Size::new(32, 32);
    let big = Size::new(64, 64);
    let small_pixels = rgba(small, 1);
    let big_pixels = rgba(big, 1);

    let first = manager
        .add_images(&context, TexturePixelType::Rgba, &[ImageRequest { id: 1, pixels: &small_pixels, size: small }])
        .expect("fits");
    let second = manager
        .add_images(
            &context,
            TexturePixelType::Rgba,
            &[
                ImageRequest { id: 2, pixels: &small_pixels, size: small },
                ImageRequest { id: 3, pixels: &big_pixels, size: big },
            ],
        )
        .expect("fits in a new atlas");

    assert!(!Arc::ptr_eq(&first.texture, &second.texture));
    assert_eq!(first.texture.region_count(), 1);
    let ids: HashSet<u32> = second.positions.iter().map(|p| p.id).collect();
    assert_eq!(ids, HashSet::from([2, 3]));
}

#[test]
fn test_empty_batch_gets_dummy() {
    let context = MockContext::new();
    let manager = DynamicTextureAtlas::new(AtlasConfig::default(), false);
    let a = manager.add_images(&context, TexturePixelType::Alpha, &[]).expect("dummy");
    let b = manager.dummy_texture(&context, TexturePixelType::Alpha).expect("dummy");
    assert_eq!(a.texture.size(), Size::new(1, 1));
    assert!(Arc::ptr_eq(&a.texture, &b));
    assert_eq!(manager.texture_count(TexturePixelType::Alpha), 0);
}

#[test]
fn test_deferred_dummy_is_created_on_flush() {
    let context = MockContext::new();
    let manager = DynamicTextureAtlas::new(AtlasConfig::default(), true);
    let batch = manager.add_images(&context, TexturePixelType::Rgba, &[]).expect("dummy");
    assert!(!batch.texture.texture().is_created());

    manager.upload_deferred_images().expect("flush");
    assert!(batch.texture.texture().is_created());
}

#[test]
fn test_failed_batch_releases_its_regions() {
    let context = MockContext::new();
    let manager = DynamicTextureAtlas::new(
        AtlasConfig {
            initial_size: 64,
            max_size: 128,
            padding: 0,
        },
        false,
    );
    let size = Size::new(4, 4);
    let good = rgba(size, 6);
    let result = manager.add_images(
        &context,
        TexturePixelType::Rgba,
        &[
            ImageRequest { id: 1, pixels: &good, size },
            ImageRequest { id: 2, pixels: &[0; 3], size },
        ],
    );
    assert!(matches!(result, Err(ResourceError::SizeMismatch { expected: 64, actual: 3 })));
    assert_eq!(manager.texture_count(TexturePixelType::Rgba), 0);

    let retry = manager
        .add_images(&context, TexturePixelType::Rgba, &[ImageRequest { id: 1, pixels: &good, size }])
        .expect("fits");
    assert_eq!(retry.texture.region_count(), 1);
    assert!(retry.handles[0].needs_upload());
    let r = retry.positions[0].rect;
    let mock = MockContext::mock_texture(retry.texture.texture().as_ref());
    assert_eq!(mock.pixel_at(r.x, r.y), vec![6; 4]);
}
