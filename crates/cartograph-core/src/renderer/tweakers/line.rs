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

//! Uniforms of line layers.

use super::{translated_matrix, try_for_each_drawable};
use crate::gfx::context::Context;
use crate::gfx::error::ResourceError;
use crate::gfx::uniform_buffer::UniformBuffer;
use crate::renderer::layer_group::LayerGroupBase;
use crate::renderer::layer_tweaker::{
    LayerTweaker, DRAWABLE_INTERPOLATE_UBO, DRAWABLE_UBO, EVALUATED_PROPS_UBO,
};
use crate::renderer::paint_parameters::PaintParameters;
use crate::renderer::style::LinePaintProperties;
use crate::tile::tile_id::pixels_to_tile_units;
use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

/// Per-drawable block of the line shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct LineDrawableUbo {
    pub matrix: [f32; 16],
    /// Screen pixels per tile unit.
    pub ratio: f32,
    pub pad: [f32; 3],
}

/// Interpolation factors of zoom-dependent line attributes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct LineInterpolateUbo {
    pub color_t: f32,
    pub blur_t: f32,
    pub opacity_t: f32,
    pub gapwidth_t: f32,
    pub offset_t: f32,
    pub width_t: f32,
    pub pad: [f32; 2],
}

/// Layer-wide line paint values.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct LineEvaluatedPropsUbo {
    pub color: [f32; 4],
    pub blur: f32,
    pub opacity: f32,
    pub gapwidth: f32,
    pub offset: f32,
    pub width: f32,
    pub floorwidth: f32,
    pub pad: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<LineDrawableUbo>() % 16 == 0);
const _: () = assert!(std::mem::size_of::<LineInterpolateUbo>() % 16 == 0);
const _: () = assert!(std::mem::size_of::<LineEvaluatedPropsUbo>() % 16 == 0);

impl From<&LinePaintProperties> for LineEvaluatedPropsUbo {
    fn from(props: &LinePaintProperties) -> Self {
        let width = props.width.constant_or_default();
        Self {
            color: props.color.constant_or_default().premultiplied(),
            blur: props.blur.constant_or_default(),
            opacity: props.opacity.constant_or_default(),
            gapwidth: props.gap_width.constant_or_default(),
            offset: props.offset.constant_or_default(),
            width,
            floorwidth: width.max(1.0),
            pad: [0.0; 2],
        }
    }
}

/// Updates the uniforms of a line layer.
#[derive(Debug)]
pub struct LineLayerTweaker {
    id: String,
    properties: LinePaintProperties,
    props_dirty: bool,
    evaluated_props: Option<Arc<dyn UniformBuffer>>,
}

impl LineLayerTweaker {
    /// Creates a tweaker for layer `id` with evaluated `properties`.
    pub fn new(id: impl Into<String>, properties: LinePaintProperties) -> Self {
        Self {
            id: id.into(),
            properties,
            props_dirty: true,
            evaluated_props: None,
        }
    }

    /// Current paint.
    pub fn properties(&self) -> &LinePaintProperties {
        &self.properties
    }

    /// Hands over a new evaluation. The layer buffer is only rewritten when it differs.
    pub fn set_properties(&mut self, properties: LinePaintProperties) {
        if properties != self.properties {
            self.properties = properties;
            self.props_dirty = true;
        }
    }

    /// The shared evaluated-properties buffer, once the tweaker ran.
    pub fn evaluated_props_buffer(&self) -> Option<&Arc<dyn UniformBuffer>> {
        self.evaluated_props.as_ref()
    }
}

impl LayerTweaker for LineLayerTweaker {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(
        &mut self,
        group: &mut dyn LayerGroupBase,
        context: &dyn Context,
        parameters: &PaintParameters,
    ) -> Result<(), ResourceError> {
        if self.props_dirty || self.evaluated_props.is_none() {
            let ubo = LineEvaluatedPropsUbo::from(&self.properties);
            context.emplace_or_update_uniform_buffer(&mut self.evaluated_props, bytemuck::bytes_of(&ubo))?;
            self.props_dirty = false;
        }
        let props_buffer = self.evaluated_props.clone();
        group.layer_uniforms_mut().set(EVALUATED_PROPS_UBO, props_buffer.clone());

        let projection = parameters.state.projection_matrix();
        let zoom = parameters.state.zoom();
        let translate = self.properties.translate;
        let anchor = self.properties.translate_anchor;
        let interpolate = LineInterpolateUbo::zeroed();

        try_for_each_drawable(group, |drawable| {
            let (matrix, ratio) = match drawable.tile_id() {
                Some(tile_id) => (
                    translated_matrix(parameters, tile_id, translate, anchor),
                    1.0 / pixels_to_tile_units(1.0, tile_id.overscaled_z, zoom),
                ),
                None => (projection, 1.0),
            };
            let drawable_ubo = LineDrawableUbo {
                matrix: matrix.to_f32_array(),
                ratio: ratio as f32,
                pad: [0.0; 3],
            };
            let uniforms = drawable.base_mut().uniform_buffers_mut();
            uniforms.create_or_update(DRAWABLE_UBO, bytemuck::bytes_of(&drawable_ubo), context)?;
            uniforms.create_or_update(
                DRAWABLE_INTERPOLATE_UBO,
                bytemuck::bytes_of(&interpolate),
                context,
            )?;
            uniforms.set(EVALUATED_PROPS_UBO, props_buffer.clone());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::style::PossiblyEvaluated;

    #[test]
    fn test_floorwidth_never_below_one_pixel() {
        let props = LinePaintProperties {
            width: PossiblyEvaluated::Constant(0.5),
            ..Default::default()
        };
        let ubo = LineEvaluatedPropsUbo::from(&props);
        assert_eq!(ubo.width, 0.5);
        assert_eq!(ubo.floorwidth, 1.0);
        assert_eq!(std::mem::size_of::<LineDrawableUbo>(), 80);
    }
}
