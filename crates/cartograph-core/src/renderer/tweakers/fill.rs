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

//! Uniforms of fill layers.

use super::{translated_matrix, try_for_each_drawable};
use crate::gfx::context::Context;
use crate::gfx::error::ResourceError;
use crate::gfx::uniform_buffer::UniformBuffer;
use crate::renderer::layer_group::LayerGroupBase;
use crate::renderer::layer_tweaker::{
    LayerTweaker, DRAWABLE_INTERPOLATE_UBO, DRAWABLE_UBO, EVALUATED_PROPS_UBO,
};
use crate::renderer::paint_parameters::PaintParameters;
use crate::renderer::style::FillPaintProperties;
use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

/// Per-drawable block of the fill shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct FillDrawableUbo {
    pub matrix: [f32; 16],
}

/// Interpolation factors of zoom-dependent fill attributes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct FillInterpolateUbo {
    pub color_t: f32,
    pub opacity_t: f32,
    pub outline_color_t: f32,
    pub pad: f32,
}

/// Layer-wide fill paint values.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct FillEvaluatedPropsUbo {
    pub color: [f32; 4],
    pub outline_color: [f32; 4],
    pub opacity: f32,
    pub fade: f32,
    pub from_scale: f32,
    pub to_scale: f32,
}

const _: () = assert!(std::mem::size_of::<FillDrawableUbo>() % 16 == 0);
const _: () = assert!(std::mem::size_of::<FillInterpolateUbo>() % 16 == 0);
const _: () = assert!(std::mem::size_of::<FillEvaluatedPropsUbo>() % 16 == 0);

impl From<&FillPaintProperties> for FillEvaluatedPropsUbo {
    fn from(props: &FillPaintProperties) -> Self {
        Self {
            color: props.color.constant_or_default().premultiplied(),
            outline_color: props.outline_color.constant_or_default().premultiplied(),
            opacity: props.opacity.constant_or_default(),
            fade: 0.0,
            from_scale: 1.0,
            to_scale: 1.0,
        }
    }
}

/// Updates the uniforms of a fill layer.
#[derive(Debug)]
pub struct FillLayerTweaker {
    id: String,
    properties: FillPaintProperties,
    props_dirty: bool,
    evaluated_props: Option<Arc<dyn UniformBuffer>>,
}

impl FillLayerTweaker {
    /// Creates a tweaker for layer `id` with evaluated `properties`.
    pub fn new(id: impl Into<String>, properties: FillPaintProperties) -> Self {
        Self {
            id: id.into(),
            properties,
            props_dirty: true,
            evaluated_props: None,
        }
    }

    /// Current paint.
    pub fn properties(&self) -> &FillPaintProperties {
        &self.properties
    }

    /// Hands over a new evaluation. The layer buffer is only rewritten when it differs.
    pub fn set_properties(&mut self, properties: FillPaintProperties) {
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

impl LayerTweaker for FillLayerTweaker {
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
            let ubo = FillEvaluatedPropsUbo::from(&self.properties);
            context.emplace_or_update_uniform_buffer(&mut self.evaluated_props, bytemuck::bytes_of(&ubo))?;
            self.props_dirty = false;
        }
        let props_buffer = self.evaluated_props.clone();
        group.layer_uniforms_mut().set(EVALUATED_PROPS_UBO, props_buffer.clone());

        let projection = parameters.state.projection_matrix();
        let translate = self.properties.translate;
        let anchor = self.properties.translate_anchor;
        let interpolate = FillInterpolateUbo {
            color_t: 0.0,
            opacity_t: 0.0,
            outline_color_t: 0.0,
            pad: 0.0,
        };

        try_for_each_drawable(group, |drawable| {
            let matrix = match drawable.tile_id() {
                Some(tile_id) => translated_matrix(parameters, tile_id, translate, anchor),
                None => projection,
            };
            let drawable_ubo = FillDrawableUbo {
                matrix: matrix.to_f32_array(),
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
    use crate::renderer::style::{Color, PossiblyEvaluated};

    #[test]
    fn test_evaluated_props_layout() {
        assert_eq!(std::mem::size_of::<FillEvaluatedPropsUbo>(), 48);
        let props = FillPaintProperties {
            color: PossiblyEvaluated::Constant(Color::new(1.0, 0.0, 0.0, 0.5)),
            opacity: PossiblyEvaluated::Constant(0.25),
            ..Default::default()
        };
        let ubo = FillEvaluatedPropsUbo::from(&props);
        assert_eq!(ubo.color, [0.5, 0.0, 0.0, 0.5]);
        assert_eq!(ubo.opacity, 0.25);
    }

    #[test]
    fn test_unchanged_properties_stay_clean() {
        let mut tweaker = FillLayerTweaker::new("water", FillPaintProperties::default());
        tweaker.props_dirty = false;
        tweaker.set_properties(FillPaintProperties::default());
        assert!(!tweaker.props_dirty);
        tweaker.set_properties(FillPaintProperties {
            antialias: false,
            ..Default::default()
        });
        assert!(tweaker.props_dirty);
    }
}
