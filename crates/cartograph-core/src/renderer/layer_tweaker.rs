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

//! Per-frame mutation of a layer group's uniforms.

use super::layer_group::LayerGroupBase;
use super::paint_parameters::PaintParameters;
use crate::gfx::context::Context;
use crate::gfx::error::ResourceError;
use crate::gfx::uniform_buffer::UniformBlockId;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

/// Renderer-wide parameters, shared by every drawable.
pub const GLOBAL_PAINT_PARAMS_UBO: UniformBlockId = 0;
/// Per-drawable block, starting with the tile matrix.
pub const DRAWABLE_UBO: UniformBlockId = 1;
/// Per-drawable interpolation factors for zoom-dependent attributes.
pub const DRAWABLE_INTERPOLATE_UBO: UniformBlockId = 2;
/// Layer-wide evaluated paint properties.
pub const EVALUATED_PROPS_UBO: UniformBlockId = 3;
/// Number of uniform block slots used by the built-in layers.
pub const UBO_COUNT: usize = 4;

/// Recomputes the uniform data of one layer group before it renders.
///
/// Tweakers run once per frame, before any drawable of the group is drawn.
/// Buffers are only rewritten when their contents change, so a static layer
/// keeps the same buffer identities frame after frame.
pub trait LayerTweaker: Send + Debug {
    /// Style layer id this tweaker serves.
    fn id(&self) -> &str;

    /// Updates `group`'s layer uniforms and the uniforms of each of its drawables.
    fn execute(
        &mut self,
        group: &mut dyn LayerGroupBase,
        context: &dyn Context,
        parameters: &PaintParameters,
    ) -> Result<(), ResourceError>;
}

/// A tweaker shared between the layer that owns its properties and the group it mutates.
pub type SharedLayerTweaker = Arc<Mutex<dyn LayerTweaker>>;

/// Runs every tweaker attached to `group`, in insertion order.
pub fn run_layer_tweakers(
    group: &mut dyn LayerGroupBase,
    context: &dyn Context,
    parameters: &PaintParameters,
) -> Result<(), ResourceError> {
    // The list is cloned so tweakers can borrow the group mutably.
    let tweakers: Vec<SharedLayerTweaker> = group.common().tweakers.clone();
    for tweaker in tweakers {
        let mut tweaker = tweaker.lock().unwrap_or_else(PoisonError::into_inner);
        log::trace!("Running layer tweaker '{}' on '{}'", tweaker.id(), group.name());
        tweaker.execute(group, context, parameters)?;
    }
    Ok(())
}
