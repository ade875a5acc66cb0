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

//! Layer groups, tweakers and the frame loop built on the [`gfx`](crate::gfx) layer.

pub mod frame;
pub mod layer_group;
pub mod layer_tweaker;
pub mod paint_parameters;
pub mod style;
pub mod tile_layer_group;
pub mod transform;
pub mod tweakers;

pub use frame::FrameRenderer;
pub use layer_group::{
    run_drawable_tweakers, DrawableKey, LayerGroup, LayerGroupBase, LayerGroupCommon,
};
pub use layer_tweaker::{
    run_layer_tweakers, LayerTweaker, SharedLayerTweaker, DRAWABLE_INTERPOLATE_UBO, DRAWABLE_UBO,
    EVALUATED_PROPS_UBO, GLOBAL_PAINT_PARAMS_UBO, UBO_COUNT,
};
pub use paint_parameters::PaintParameters;
pub use tile_layer_group::TileLayerGroup;
pub use transform::TransformState;
