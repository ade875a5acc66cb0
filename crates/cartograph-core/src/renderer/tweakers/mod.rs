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

//! Layer tweakers for the built-in layer types and the uniform layouts they write.
//!
//! Every uniform struct here is `#[repr(C)]`, padded to a multiple of 16 bytes
//! and laid out field for field like the block the shader declares. Reordering
//! a field breaks the shader binding.

pub mod fill;
pub mod line;

pub use fill::{FillDrawableUbo, FillEvaluatedPropsUbo, FillInterpolateUbo, FillLayerTweaker};
pub use line::{LineDrawableUbo, LineEvaluatedPropsUbo, LineInterpolateUbo, LineLayerTweaker};

use super::layer_group::LayerGroupBase;
use super::paint_parameters::PaintParameters;
use super::style::TranslateAnchor;
use crate::gfx::drawable::Drawable;
use crate::gfx::error::ResourceError;
use crate::math::Mat4;
use crate::tile::tile_id::{pixels_to_tile_units, OverscaledTileId};
use bytemuck::{Pod, Zeroable};

/// Renderer-wide values, bound at [`GLOBAL_PAINT_PARAMS_UBO`](super::layer_tweaker::GLOBAL_PAINT_PARAMS_UBO).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct GlobalPaintParamsUbo {
    pub pattern_atlas_texsize: [f32; 2],
    pub units_to_pixels: [f32; 2],
    pub world_size: [f32; 2],
    pub camera_to_center_distance: f32,
    pub symbol_fade_change: f32,
    pub aspect_ratio: f32,
    pub pixel_ratio: f32,
    pub map_zoom: f32,
    pub pad: f32,
}

const _: () = assert!(std::mem::size_of::<GlobalPaintParamsUbo>() % 16 == 0);

impl GlobalPaintParamsUbo {
    /// Values for the frame described by `parameters`.
    pub fn new(parameters: &PaintParameters, pattern_atlas_size: [f32; 2]) -> Self {
        let size = parameters.state.size();
        let width = size.width.max(1) as f32;
        let height = size.height.max(1) as f32;
        Self {
            pattern_atlas_texsize: pattern_atlas_size,
            units_to_pixels: [1.0 / (width / 2.0), -1.0 / (height / 2.0)],
            world_size: [width, height],
            camera_to_center_distance: parameters.state.camera_to_center_distance() as f32,
            symbol_fade_change: 1.0,
            aspect_ratio: width / height,
            pixel_ratio: parameters.pixel_ratio,
            map_zoom: parameters.state.zoom() as f32,
            pad: 0.0,
        }
    }
}

/// Tile matrix of `tile_id`, shifted by a paint `translate` given in pixels.
pub fn translated_matrix(
    parameters: &PaintParameters,
    tile_id: &OverscaledTileId,
    translate: [f32; 2],
    anchor: TranslateAnchor,
) -> Mat4 {
    let matrix = parameters.state.matrix_for(&tile_id.to_unwrapped());
    if translate == [0.0, 0.0] {
        return matrix;
    }
    let (mut x, mut y) = (f64::from(translate[0]), f64::from(translate[1]));
    if anchor == TranslateAnchor::Viewport {
        let (sin, cos) = (-parameters.state.bearing()).sin_cos();
        (x, y) = (x * cos - y * sin, x * sin + y * cos);
    }
    let units = pixels_to_tile_units(1.0, tile_id.overscaled_z, parameters.state.zoom());
    matrix.translate(x * units, y * units, 0.0)
}

/// Runs `f` on every drawable of `group`, stopping at the first error.
pub(crate) fn try_for_each_drawable(
    group: &mut dyn LayerGroupBase,
    mut f: impl FnMut(&mut dyn Drawable) -> Result<(), ResourceError>,
) -> Result<(), ResourceError> {
    let mut result = Ok(());
    group.visit_drawables_mut(&mut |drawable| {
        if result.is_ok() {
            result = f(drawable);
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::types::Size;
    use crate::renderer::transform::TransformState;
    use approx::assert_relative_eq;

    #[test]
    fn test_translate_is_scaled_to_tile_units() {
        let mut state = TransformState::new(Size::new(512, 512));
        state.set_zoom(1.0);
        let params = PaintParameters::new(state, 1.0, 0);
        let tile = OverscaledTileId::from_zxy(1, 0, 0);

        let plain = translated_matrix(&params, &tile, [0.0, 0.0], TranslateAnchor::Map);
        let moved = translated_matrix(&params, &tile, [10.0, 0.0], TranslateAnchor::Map);

        // At tile zoom, 10 pixels are 160 tile units.
        let a = plain.transform([160.0, 0.0, 0.0, 1.0]);
        let b = moved.transform([0.0, 0.0, 0.0, 1.0]);
        for i in 0..4 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-9);
        }
    }
}
