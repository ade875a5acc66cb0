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

use cartograph_core::gfx::state::Viewport;
use cartograph_core::gfx::{
    BackendScope, Context, ContextMode, DrawableBase, DrawableTweaker, DynamicTextureAtlas, ImageRequest, RenderError,
    RenderPasses, RendererBackend, ShaderError, Size, Texture2D, TexturePixelType,
};
use cartograph_core::renderer::layer_tweaker::GLOBAL_PAINT_PARAMS_UBO;
use cartograph_core::renderer::{
    FrameRenderer, LayerGroup, LayerGroupBase, PaintParameters, TransformState,
};
use cartograph_core::{AtlasConfig, RenderThreadScheduler, Scheduler};
use common::{MockBackend, MockContext};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

fn group(context: &MockContext, name: &str, index: i32) -> Box<dyn LayerGroupBase> {
    let mut group = LayerGroup::new(name, index);
    for (suffix, pass) in [("solid", RenderPasses::OPAQUE), ("glass", RenderPasses::TRANSLUCENT)] {
        let mut drawable = context.create_drawable(&format!("{name}-{suffix}"));
        drawable.base_mut().set_render_passes(pass);
        group.add_drawable(drawable);
    }
    Box::new(group)
}

fn setup() -> (MockBackend, MockContext, FrameRenderer, TransformState) {
    let context = MockContext::new();
    let mut renderer = FrameRenderer::new(Arc::new(RenderThreadScheduler::new()));
    renderer.add_layer_group(group(&context, "top", 1));
    renderer.add_layer_group(group(&context, "base", 0));
    (
        MockBackend::new(ContextMode::Unique),
        context,
        renderer,
        TransformState::new(Size::new(800, 600)),
    )
}

#[test]
fn test_groups_are_kept_in_layer_order() {
    let (_backend, context, mut renderer, _state) = setup();
    renderer.add_layer_group(group(&context, "middle", 1));
    assert_eq!(renderer.layer_group_names(), vec!["base", "top", "middle"]);
    assert!(renderer.remove_layer_group("top").is_some());
    assert!(renderer.remove_layer_group("top").is_none());
    assert_eq!(renderer.layer_group_names(), vec!["base", "middle"]);
}

#[test]
fn test_frame_draws_opaque_front_to_back_then_translucent() {
    let (backend, context, mut renderer, state) = setup();
    assert!(renderer.render_frame(&backend, &context, &state, 1.0).expect("frame"));

    let log = context.log.lock().unwrap().clone();
    let pass_at = log.iter().position(|c| c == "render_pass:main").expect("main pass");
    let last_upload = log.iter().rposition(|c| c.starts_with("upload:")).expect("uploads");
    assert!(last_upload < pass_at);
    assert_eq!(log[pass_at + 1], "viewport:800x600");
    assert_eq!(log.last().map(String::as_str), Some("submit"));

    assert_eq!(
        context.calls("draw:"),
        vec![
            "draw:top-solid:opaque",
            "draw:base-solid:opaque",
            "draw:base-glass:translucent",
            "draw:top-glass:translucent",
        ]
    );
    assert_eq!(context.submits.load(Ordering::SeqCst), 1);
    assert_eq!(context.cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.frame(), 1);
}

#[test]
fn test_global_uniforms_are_bound_to_enabled_groups() {
    let (backend, context, mut renderer, state) = setup();
    renderer
        .layer_group_mut("top")
        .expect("group")
        .set_enabled(false);
    renderer.render_frame(&backend, &context, &state, 2.0).expect("frame");

    let base = renderer.layer_group("base").expect("group");
    assert!(base.layer_uniforms().get(GLOBAL_PAINT_PARAMS_UBO).is_some());
    let top = renderer.layer_group("top").expect("group");
    assert!(top.layer_uniforms().get(GLOBAL_PAINT_PARAMS_UBO).is_none());
    assert!(context.calls("draw:top").is_empty());
    assert_eq!(context.uniform_buffers_created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_backend_is_activated_once_per_frame() {
    let (backend, context, mut renderer, state) = setup();
    renderer.render_frame(&backend, &context, &state, 1.0).expect("frame");
    assert_eq!(backend.activations.load(Ordering::SeqCst), 1);
    assert_eq!(backend.deactivations.load(Ordering::SeqCst), 1);

    {
        let outer = BackendScope::new(&backend, Some(&context));
        renderer.render_frame(&backend, &context, &state, 1.0).expect("frame");
        assert_eq!(outer.depth(), 1);
        assert_eq!(backend.activations.load(Ordering::SeqCst), 2);
        assert_eq!(backend.deactivations.load(Ordering::SeqCst), 1);
    }
    assert_eq!(backend.deactivations.load(Ordering::SeqCst), 2);
}

#[derive(Debug, Default)]
struct CountingTweaker(AtomicUsize);

impl DrawableTweaker for CountingTweaker {
    fn execute(&self, _drawable: &mut DrawableBase, _parameters: &PaintParameters) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_drawable_tweakers_run_once_per_frame() {
    let (backend, context, mut renderer, state) = setup();
    let tweaker = Arc::new(CountingTweaker::default());
    let mut drawable = context.create_drawable("both");
    drawable
        .base_mut()
        .set_render_passes(RenderPasses::OPAQUE.union(RenderPasses::TRANSLUCENT));
    drawable.base_mut().add_tweaker(tweaker.clone());
    let mut both = LayerGroup::new("both", 2);
    both.add_drawable(drawable);
    renderer.add_layer_group(Box::new(both));

    renderer.render_frame(&backend, &context, &state, 1.0).expect("frame");
    assert_eq!(context.calls("draw:both").len(), 2);
    assert_eq!(tweaker.0.load(Ordering::SeqCst), 1);

    renderer.render_frame(&backend, &context, &state, 1.0).expect("frame");
    assert_eq!(tweaker.0.load(Ordering::SeqCst), 2);
}

#[test]
fn test_each_thread_activates_its_own_scope() {
    let backend = MockBackend::new(ContextMode::Unique);
    let shared = &backend;
    thread::scope(|s| {
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        s.spawn(move || {
            let _scope = BackendScope::new(shared, None);
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });
        held_rx.recv().unwrap();

        {
            let scope = BackendScope::new(shared, None);
            assert_eq!(scope.depth(), 1);
            assert_eq!(shared.activations.load(Ordering::SeqCst), 2);
            assert_eq!(shared.scope_state().active_threads(), 2);
        }
        assert_eq!(shared.deactivations.load(Ordering::SeqCst), 1);
        assert!(!shared.scope_state().is_active());
        release_tx.send(()).unwrap();
    });
    assert_eq!(backend.deactivations.load(Ordering::SeqCst), 2);
    assert_eq!(backend.scope_state().active_threads(), 0);
}

#[test]
fn test_shared_mode_dirties_state_on_outermost_scope() {
    let backend = MockBackend::new(ContextMode::Shared);
    let context = MockContext::new();
    let viewport = Viewport {
        width: 800.0,
        height: 600.0,
        ..Default::default()
    };
    context.assume_viewport(viewport);
    assert!(!context.state.lock().unwrap().viewport.is_dirty());

    let outer = BackendScope::new(&backend, Some(&context));
    assert!(context.state.lock().unwrap().viewport.is_dirty());

    context.assume_viewport(viewport);
    {
        let _inner = BackendScope::new(&backend, Some(&context));
        assert!(!context.state.lock().unwrap().viewport.is_dirty());
    }
    drop(outer);

    let unique = MockBackend::new(ContextMode::Unique);
    let _scope = BackendScope::new(&unique, Some(&context));
    assert!(!context.state.lock().unwrap().viewport.is_dirty());
}

#[test]
fn test_scheduled_tasks_run_before_drawing() {
    let (backend, context, mut renderer, state) = setup();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    renderer
        .scheduler()
        .schedule(Box::new(move || flag.store(true, Ordering::SeqCst)));
    assert_eq!(renderer.scheduler().pending_count(), 1);

    renderer.render_frame(&backend, &context, &state, 1.0).expect("frame");
    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(renderer.scheduler().pending_count(), 0);
}

#[test]
fn test_device_loss_drops_the_frame() {
    let (backend, context, mut renderer, state) = setup();
    *context.fail_render_pass.lock().unwrap() = Some(RenderError::DeviceLost("reset".into()));

    let submitted = renderer.render_frame(&backend, &context, &state, 1.0).expect("recoverable");
    assert!(!submitted);
    assert_eq!(context.submits.load(Ordering::SeqCst), 0);
    assert_eq!(backend.scope_state().depth(), 0);

    assert!(renderer.render_frame(&backend, &context, &state, 1.0).expect("frame"));
    assert_eq!(context.submits.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.frame(), 2);
}

#[test]
fn test_fatal_errors_are_returned() {
    let (backend, context, mut renderer, state) = setup();
    *context.fail_render_pass.lock().unwrap() =
        Some(RenderError::Shader(ShaderError::UnknownShader("FillShader".into())));
    let result = renderer.render_frame(&backend, &context, &state, 1.0);
    assert!(matches!(result, Err(RenderError::Shader(_))));
    assert_eq!(context.cleanups.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deferred_atlas_uploads_are_flushed() {
    let (backend, context, mut renderer, state) = setup();
    let atlas = Arc::new(DynamicTextureAtlas::new(AtlasConfig::default(), true));
    let size = Size::new(8, 8);
    let pixels = vec![255u8; size.area() * 4];
    let batch = atlas
        .add_images(&context, TexturePixelType::Rgba, &[ImageRequest { id: 7, pixels: &pixels, size }])
        .expect("fits");
    assert!(!batch.texture.texture().is_created());
    renderer.set_atlas(Some(atlas));

    renderer.render_frame(&backend, &context, &state, 1.0).expect("frame");
    assert!(batch.texture.texture().is_created());
    assert_eq!(batch.texture.pending_upload_count(), 0);
}
