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

//! Ordered collections of drawables for one style layer.

use super::layer_tweaker::{SharedLayerTweaker, UBO_COUNT};
use super::paint_parameters::PaintParameters;
use crate::gfx::command::{RenderPass, UploadPass};
use crate::gfx::context::Context;
use crate::gfx::drawable::Drawable;
use crate::gfx::error::{RenderError, ResourceError};
use crate::gfx::uniform_buffer::UniformBufferArray;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Orders drawables inside a group: by draw priority, then by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableKey {
    /// Draw priority at insertion time.
    pub priority: i64,
    /// Drawable id, unique per process.
    pub id: u64,
}

impl DrawableKey {
    /// Key of `drawable` as it is now.
    pub fn of(drawable: &dyn Drawable) -> Self {
        Self {
            priority: drawable.draw_priority(),
            id: drawable.id(),
        }
    }
}

pub(crate) type DrawableMap = BTreeMap<DrawableKey, Box<dyn Drawable>>;

/// State shared by every kind of layer group.
#[derive(Debug)]
pub struct LayerGroupCommon {
    /// Style layer id.
    pub name: String,
    /// Position in the layer stack; lower indices are further back.
    pub layer_index: i32,
    /// Disabled groups skip upload and render.
    pub enabled: bool,
    /// Tweakers run before every render.
    pub tweakers: Vec<SharedLayerTweaker>,
    /// Uniforms bound for every drawable that does not override them.
    pub layer_uniforms: UniformBufferArray,
}

impl LayerGroupCommon {
    /// Creates an enabled group with no tweakers.
    pub fn new(name: impl Into<String>, layer_index: i32) -> Self {
        Self {
            name: name.into(),
            layer_index,
            enabled: true,
            tweakers: Vec::new(),
            layer_uniforms: UniformBufferArray::new(UBO_COUNT),
        }
    }
}

/// A collection of drawables for one style layer, driven by the frame renderer.
///
/// Removing a drawable from a group drops it, which releases its GPU buffers;
/// groups therefore live on the render thread.
pub trait LayerGroupBase: Send + Debug {
    /// Shared state.
    fn common(&self) -> &LayerGroupCommon;

    /// Shared state, mutably.
    fn common_mut(&mut self) -> &mut LayerGroupCommon;

    /// Number of drawables in the group.
    fn drawable_count(&self) -> usize;

    /// Calls `f` on every drawable in draw order.
    fn visit_drawables(&self, f: &mut dyn FnMut(&dyn Drawable));

    /// Calls `f` on every drawable in draw order, mutably.
    fn visit_drawables_mut(&mut self, f: &mut dyn FnMut(&mut dyn Drawable));

    /// Removes every drawable matching `predicate`. Returns how many were removed.
    fn remove_drawables_if(&mut self, predicate: &mut dyn FnMut(&dyn Drawable) -> bool) -> usize;

    /// Removes every drawable.
    fn clear_drawables(&mut self);

    /// Creates or refreshes GPU buffers for drawables whose data changed.
    fn upload(&mut self, pass: &mut dyn UploadPass) -> Result<(), ResourceError>;

    /// Draws the drawables taking part in `parameters.render_pass`.
    fn render(
        &mut self,
        pass: &mut dyn RenderPass,
        parameters: &PaintParameters,
    ) -> Result<(), RenderError>;

    /// Called once per frame before any pass renders.
    fn pre_render(&mut self, _context: &dyn Context, _parameters: &PaintParameters) {}

    /// Called once per frame after every pass rendered.
    fn post_render(&mut self, _context: &dyn Context, _parameters: &PaintParameters) {}

    /// Style layer id.
    fn name(&self) -> &str {
        &self.common().name
    }

    /// Position in the layer stack.
    fn layer_index(&self) -> i32 {
        self.common().layer_index
    }

    /// Whether the group takes part in frames.
    fn enabled(&self) -> bool {
        self.common().enabled
    }

    /// Enables or disables every drawable of the group at once.
    fn set_enabled(&mut self, enabled: bool) {
        self.common_mut().enabled = enabled;
    }

    /// Appends a tweaker; it runs after those already attached.
    fn add_layer_tweaker(&mut self, tweaker: SharedLayerTweaker) {
        self.common_mut().tweakers.push(tweaker);
    }

    /// Detaches every tweaker.
    fn clear_layer_tweakers(&mut self) {
        self.common_mut().tweakers.clear();
    }

    /// Layer-level uniform buffers.
    fn layer_uniforms(&self) -> &UniformBufferArray {
        &self.common().layer_uniforms
    }

    /// Layer-level uniform buffers, mutably.
    fn layer_uniforms_mut(&mut self) -> &mut UniformBufferArray {
        &mut self.common_mut().layer_uniforms
    }
}

pub(crate) fn upload_all(
    name: &str,
    drawables: &mut DrawableMap,
    pass: &mut dyn UploadPass,
) -> Result<(), ResourceError> {
    pass.push_debug_group(name);
    let result = drawables
        .values_mut()
        .filter(|d| d.is_enabled())
        .try_for_each(|d| d.upload(pass));
    pass.pop_debug_group();
    result
}

/// Runs the tweakers of every enabled drawable of `group`. Called once per
/// frame, before any pass renders.
pub fn run_drawable_tweakers(group: &mut dyn LayerGroupBase, parameters: &PaintParameters) {
    group.visit_drawables_mut(&mut |d| {
        if d.is_enabled() {
            d.base_mut().run_tweakers(parameters);
        }
    });
}

pub(crate) fn render_all(
    common: &LayerGroupCommon,
    drawables: &mut DrawableMap,
    pass: &mut dyn RenderPass,
    parameters: &PaintParameters,
) -> Result<(), RenderError> {
    pass.push_debug_group(&common.name);
    let result = drawables
        .values_mut()
        .filter(|d| d.is_enabled() && d.has_render_pass(parameters.render_pass))
        .try_for_each(|d| d.draw(pass, &common.layer_uniforms, parameters));
    pass.pop_debug_group();
    result
}

/// A layer group whose drawables are not tied to tiles (background, sky).
#[derive(Debug)]
pub struct LayerGroup {
    common: LayerGroupCommon,
    drawables: DrawableMap,
}

impl LayerGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>, layer_index: i32) -> Self {
        Self {
            common: LayerGroupCommon::new(name, layer_index),
            drawables: BTreeMap::new(),
        }
    }

    /// Takes ownership of `drawable`.
    pub fn add_drawable(&mut self, drawable: Box<dyn Drawable>) {
        self.drawables.insert(DrawableKey::of(drawable.as_ref()), drawable);
    }

    /// Adds every drawable of a builder.
    pub fn add_drawables(&mut self, drawables: impl IntoIterator<Item = Box<dyn Drawable>>) {
        for drawable in drawables {
            self.add_drawable(drawable);
        }
    }
}

impl LayerGroupBase for LayerGroup {
    fn common(&self) -> &LayerGroupCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut LayerGroupCommon {
        &mut self.common
    }

    fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    fn visit_drawables(&self, f: &mut dyn FnMut(&dyn Drawable)) {
        self.drawables.values().for_each(|d| f(d.as_ref()));
    }

    fn visit_drawables_mut(&mut self, f: &mut dyn FnMut(&mut dyn Drawable)) {
        self.drawables.values_mut().for_each(|d| f(d.as_mut()));
    }

    fn remove_drawables_if(&mut self, predicate: &mut dyn FnMut(&dyn Drawable) -> bool) -> usize {
        let before = self.drawables.len();
        self.drawables.retain(|_, d| !predicate(d.as_ref()));
        before - self.drawables.len()
    }

    fn clear_drawables(&mut self) {
        self.drawables.clear();
    }

    fn upload(&mut self, pass: &mut dyn UploadPass) -> Result<(), ResourceError> {
        if !self.common.enabled {
            return Ok(());
        }
        upload_all(&self.common.name, &mut self.drawables, pass)
    }

    fn render(
        &mut self,
        pass: &mut dyn RenderPass,
        parameters: &PaintParameters,
    ) -> Result<(), RenderError> {
        if !self.common.enabled {
            return Ok(());
        }
        render_all(&self.common, &mut self.drawables, pass, parameters)
    }
}
