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


use cartograph_core::gfx::{
    Context, DrawableBuilder, RenderPasses, Renderable, RendererBackend, Size,
    Texture2D, TextureChannelDataType, TexturePixelType,
};
use cartograph_core::gfx::shader::{ProgramParameters, ShaderProgram, ShaderRegistry};
use cartograph_core::renderer::style::{Color, FillPaintProperties, PossiblyEvaluated};
use cartograph_core::renderer::tweakers::fill::FillLayerTweaker;
use cartograph_core::renderer::{FrameRenderer, LayerGroup, LayerGroupBase, TransformState};
use cartograph_core::tile::{OverscaledTileId, EXTENT};
use cartograph_core::{RenderThreadScheduler, RendererConfig};
use cartograph_infra::graphics::wgpu::shaders::FILL_SHADER;
use cartograph_infra::graphics::wgpu::{WgpuContext, WgpuRendererBackend, WgpuShaderProgram};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

const SIZE: Size = Size {
    width: 64,
    height: 64,
};

fn headless() -> Option<(WgpuRendererBackend, WgpuContext)> {
    let _ = env_logger::builder().is_test(true).try_init();
    match WgpuRendererBackend::new_headless(&RendererConfig::default(), SIZE) {
        Ok(backend) => {
            let context = backend.create_wgpu_context();
            Some((backend, context))
        }
        Err(e) => {
            eprintln!("Skipping: no usable GPU adapter ({e})");
            None
        }
    }
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
    let o = ((y * SIZE.width + x) * 4) as usize;
    [pixels[o], pixels[o + 1], pixels[o + 2], pixels[o + 3]]
}

#[test]
fn test_backend_reports_selected_adapter() {
    let Some((backend, _context)) = headless() else {
        return;
    };
    assert_eq!(backend.backend_type(), backend.adapter_info().backend_type);
    assert_eq!(backend.default_renderable().size(), SIZE);
    assert!(backend
        .attempted_backends()
        .contains(&backend.backend_type()));
}

#[test]
fn test_init_shaders_is_idempotent() {
    let Some((backend, _context)) = headless() else {
        return;
    };
    let registry = ShaderRegistry::new();
    let parameters = ProgramParameters::new(1.0, false);
    backend.init_shaders(&registry, &parameters).expect("first init");
    let count = registry.len();
    assert!(registry.is_registered(FILL_SHADER));

    backend.init_shaders(&registry, &parameters).expect("second init");
    assert_eq!(registry.len(), count);
}

#[test]
fn test_fill_variants_compile_and_are_cached() {
    let Some((backend, context)) = headless() else {
        return;
    };
    let registry = ShaderRegistry::new();
    backend
        .init_shaders(&registry, &ProgramParameters::new(2.0, false))
        .expect("init");
    let group = registry.get_shader_group(FILL_SHADER).expect("fill group");

    let promoted: BTreeSet<String> = ["color".to_string(), "opacity".to_string()].into();
    let uniform_variant = group
        .get_or_create_shader(&context, &promoted, "a_pos")
        .expect("uniform variant");
    let attribute_variant = group
        .get_or_create_shader(&context, &BTreeSet::new(), "a_pos")
        .expect("attribute variant");
    assert_eq!(group.len(), 2);
    assert_ne!(uniform_variant.name(), attribute_variant.name());

    assert!(uniform_variant.vertex_attributes().get("a_color").is_none());
    assert!(attribute_variant.vertex_attributes().get("a_color").is_some());
    assert!(uniform_variant
        .as_any()
        .downcast_ref::<WgpuShaderProgram>()
        .is_some());

    let again = group
        .get_or_create_shader(&context, &promoted, "a_pos")
        .expect("cached");
    assert!(Arc::ptr_eq(&again, &uniform_variant));
}

#[test]
fn test_missing_first_attribute_is_rejected() {
    let Some((backend, context)) = headless() else {
        return;
    };
    let registry = ShaderRegistry::new();
    backend
        .init_shaders(&registry, &ProgramParameters::new(1.0, false))
        .expect("init");
    let group = registry.get_shader_group(FILL_SHADER).expect("fill group");
    assert!(group
        .get_or_create_shader(&context, &BTreeSet::new(), "a_missing")
        .is_err());
    assert!(group.is_empty());
}

#[test]
fn test_texture_upload_is_tracked() {
    let Some((_backend, context)) = headless() else {
        return;
    };
    let texture = context.create_texture_2d();
    texture.set_format(TexturePixelType::Rgba, TextureChannelDataType::UnsignedByte);
    texture.set_size(Size::new(4, 4));
    texture.create().expect("create");
    assert!(texture.is_created());
    texture.upload(&[255; 64]).expect("upload");
    assert!(texture.upload(&[0; 3]).is_err());

    let stats = context.stats();
    assert_eq!(stats.num_active_textures, 1);
    assert_eq!(stats.memory_textures, 64);
    drop(texture);
    assert_eq!(context.stats().num_active_textures, 0);
}

#[test]
fn test_empty_frame_clears_target() {
    let Some((backend, context)) = headless() else {
        return;
    };
    let mut renderer = FrameRenderer::new(Arc::new(RenderThreadScheduler::new()));
    renderer.set_clear_color([0.0, 0.0, 1.0, 1.0]);
    let state = TransformState::new(SIZE);
    assert!(renderer
        .render_frame(&backend, &context, &state, 1.0)
        .expect("frame"));

    let pixels = backend
        .renderable()
        .read_pixels()
        .expect("readback")
        .expect("offscreen pixels");
    assert_eq!(pixels.len(), (SIZE.width * SIZE.height * 4) as usize);
    assert_eq!(pixel(&pixels, 0, 0), [0, 0, 255, 255]);
    assert_eq!(pixel(&pixels, 63, 63), [0, 0, 255, 255]);
}

#[test]
fn test_fill_tile_covers_viewport() {
    let Some((backend, context)) = headless() else {
        return;
    };
    let registry = ShaderRegistry::new();
    backend
        .init_shaders(&registry, &ProgramParameters::new(1.0, false))
        .expect("init");

    let properties = FillPaintProperties {
        color: PossiblyEvaluated::Constant(Color::new(1.0, 0.0, 0.0, 1.0)),
        opacity: PossiblyEvaluated::Constant(1.0),
        ..Default::default()
    };
    let shader = registry
        .get_shader_group(FILL_SHADER)
        .expect("fill group")
        .get_or_create_shader(&context, &properties.properties_as_uniforms(), "a_pos")
        .expect("fill program");

    let mut builder = DrawableBuilder::new(&context, "land");
    builder.set_shader(shader);
    builder.set_render_passes(RenderPasses::OPAQUE);
    builder.set_tile_id(Some(OverscaledTileId::from_zxy(0, 0, 0)));
    let extent = EXTENT as i16;
    builder.add_quad(0, 0, extent, extent);
    builder.flush();

    let mut group = LayerGroup::new("land", 0);
    group.add_drawables(builder.take_drawables());
    group.add_layer_tweaker(Arc::new(Mutex::new(FillLayerTweaker::new("land", properties))));

    let mut renderer = FrameRenderer::new(Arc::new(RenderThreadScheduler::new()));
    renderer.set_clear_color([0.0, 0.0, 0.0, 1.0]);
    renderer.add_layer_group(Box::new(group));

    // At zoom 0 the world tile is 512 pixels wide, larger than the target.
    let state = TransformState::new(SIZE);
    for _ in 0..2 {
        assert!(renderer
            .render_frame(&backend, &context, &state, 1.0)
            .expect("frame"));
    }

    let pixels = backend
        .renderable()
        .read_pixels()
        .expect("readback")
        .expect("offscreen pixels");
    assert_eq!(pixel(&pixels, 32, 32), [255, 0, 0, 255]);

    let stats = context.stats();
    assert_eq!(stats.num_drawables, 1);
    assert_eq!(stats.num_draw_calls, 1);
    assert_eq!(stats.num_triangles, 2);
}
