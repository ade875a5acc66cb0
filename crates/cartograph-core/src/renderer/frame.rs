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

//! Per-frame orchestration of layer groups.

use super::layer_group::{run_drawable_tweakers, LayerGroupBase};
use super::layer_tweaker::{run_layer_tweakers, GLOBAL_PAINT_PARAMS_UBO};
use super::paint_parameters::PaintParameters;
use super::transform::TransformState;
use super::tweakers::GlobalPaintParamsUbo;
use crate::gfx::backend::{BackendScope, RendererBackend};
use crate::gfx::command::RenderPassDescriptor;
use crate::gfx::context::Context;
use crate::gfx::dynamic_texture_atlas::DynamicTextureAtlas;
use crate::gfx::error::RenderError;
use crate::gfx::state::Viewport;
use crate::gfx::types::RenderPasses;
use crate::gfx::uniform_buffer::UniformBufferArray;
use crate::scheduler::RenderThreadScheduler;
use std::sync::Arc;

/// Drives one frame through every layer group, in layer order.
///
/// Within a frame:
/// 1. tasks posted to the render thread (deferred tile releases) run,
/// 2. deferred atlas images are uploaded,
/// 3. every group uploads its changed drawables,
/// 4. layer tweakers refresh uniforms,
/// 5. opaque drawables render front to back, then translucent ones back to front.
///
/// Device loss, out-of-memory and surface errors drop the frame; the next call
/// starts over.
#[derive(Debug)]
pub struct FrameRenderer {
    layer_groups: Vec<Box<dyn LayerGroupBase>>,
    atlas: Option<Arc<DynamicTextureAtlas>>,
    scheduler: Arc<RenderThreadScheduler>,
    global_uniforms: UniformBufferArray,
    frame: u64,
    clear_color: [f64; 4],
}

impl FrameRenderer {
    /// Creates a renderer draining `scheduler` on every frame.
    pub fn new(scheduler: Arc<RenderThreadScheduler>) -> Self {
        Self {
            layer_groups: Vec::new(),
            atlas: None,
            scheduler,
            global_uniforms: UniformBufferArray::new(1),
            frame: 0,
            clear_color: [0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Atlas whose deferred uploads are flushed before drawing.
    pub fn set_atlas(&mut self, atlas: Option<Arc<DynamicTextureAtlas>>) {
        self.atlas = atlas;
    }

    /// Color the main pass clears to, as RGBA in `0..=1`.
    pub fn set_clear_color(&mut self, color: [f64; 4]) {
        self.clear_color = color;
    }

    /// The render-thread task queue.
    pub fn scheduler(&self) -> &Arc<RenderThreadScheduler> {
        &self.scheduler
    }

    /// Number of frames attempted so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Inserts `group` by layer index. Groups with equal indices keep insertion order.
    pub fn add_layer_group(&mut self, group: Box<dyn LayerGroupBase>) {
        let index = group.layer_index();
        let position = self
            .layer_groups
            .partition_point(|g| g.layer_index() <= index);
        log::debug!("Adding layer group '{}' at index {}", group.name(), index);
        self.layer_groups.insert(position, group);
    }

    /// Removes the group named `name`; its drawables are dropped with it.
    pub fn remove_layer_group(&mut self, name: &str) -> Option<Box<dyn LayerGroupBase>> {
        let position = self.layer_groups.iter().position(|g| g.name() == name)?;
        Some(self.layer_groups.remove(position))
    }

    /// Looks up a group by name.
    pub fn layer_group(&self, name: &str) -> Option<&dyn LayerGroupBase> {
        self.layer_groups
            .iter()
            .find(|g| g.name() == name)
            .map(|g| g.as_ref())
    }

    /// Looks up a group by name, mutably.
    pub fn layer_group_mut(&mut self, name: &str) -> Option<&mut dyn LayerGroupBase> {
        self.layer_groups
            .iter_mut()
            .find(|g| g.name() == name)
            .map(|g| -> &mut dyn LayerGroupBase { g.as_mut() })
    }

    /// Group names in render order.
    pub fn layer_group_names(&self) -> Vec<&str> {
        self.layer_groups.iter().map(|g| g.name()).collect()
    }

    /// Renders one frame.
    ///
    /// Returns `Ok(true)` when the frame was submitted and `Ok(false)` when it
    /// was dropped after a recoverable GPU error. Other errors are returned.
    pub fn render_frame(
        &mut self,
        backend: &dyn RendererBackend,
        context: &dyn Context,
        state: &TransformState,
        pixel_ratio: f32,
    ) -> Result<bool, RenderError> {
        let _scope = BackendScope::new(backend, Some(context));
        self.frame += 1;

        self.scheduler.run_pending();

        context.begin_frame();
        let result = self.draw_frame(context, state, pixel_ratio);
        context.end_frame();
        context.perform_cleanup();

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_frame_recoverable() => {
                log::warn!("Dropped frame {}: {}", self.frame, e);
                Ok(false)
            }
            Err(e) => {
                log::error!("Frame {} failed: {}", self.frame, e);
                Err(e)
            }
        }
    }

    fn draw_frame(
        &mut self,
        context: &dyn Context,
        state: &TransformState,
        pixel_ratio: f32,
    ) -> Result<(), RenderError> {
        if let Some(atlas) = &self.atlas {
            atlas.upload_deferred_images()?;
        }

        let mut params = PaintParameters::new(state.clone(), pixel_ratio, self.frame);
        let mut encoder = context.create_command_encoder()?;

        {
            let mut upload = encoder.create_upload_pass("upload");
            for group in &mut self.layer_groups {
                group.upload(upload.as_mut())?;
            }
        }

        let global = GlobalPaintParamsUbo::new(&params, [0.0, 0.0]);
        self.global_uniforms
            .create_or_update(GLOBAL_PAINT_PARAMS_UBO, bytemuck::bytes_of(&global), context)?;
        let global_buffer = self.global_uniforms.get(GLOBAL_PAINT_PARAMS_UBO).cloned();

        for group in &mut self.layer_groups {
            if !group.enabled() {
                continue;
            }
            group
                .layer_uniforms_mut()
                .set(GLOBAL_PAINT_PARAMS_UBO, global_buffer.clone());
            run_layer_tweakers(group.as_mut(), context, &params)?;
            run_drawable_tweakers(group.as_mut(), &params);
            group.pre_render(context, &params);
        }

        {
            let descriptor = RenderPassDescriptor {
                clear_color: Some(self.clear_color),
                clear_depth: Some(1.0),
                clear_stencil: Some(0),
            };
            let mut pass = encoder.create_render_pass("main", descriptor)?;
            let size = state.size();
            pass.set_viewport(Viewport {
                x: 0.0,
                y: 0.0,
                width: size.width as f32,
                height: size.height as f32,
            });

            params.render_pass = RenderPasses::OPAQUE;
            for group in self.layer_groups.iter_mut().rev() {
                group.render(pass.as_mut(), &params)?;
            }

            params.render_pass = RenderPasses::TRANSLUCENT;
            for group in self.layer_groups.iter_mut() {
                group.render(pass.as_mut(), &params)?;
            }
        }

        for group in &mut self.layer_groups {
            group.post_render(context, &params);
        }

        encoder.submit()
    }
}
