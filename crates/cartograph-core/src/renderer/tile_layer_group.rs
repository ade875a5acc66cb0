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

//! Layer groups whose drawables are keyed by tile.

use super::layer_group::{
    render_all, upload_all, DrawableKey, DrawableMap, LayerGroupBase, LayerGroupCommon,
};
use super::paint_parameters::PaintParameters;
use crate::gfx::command::{RenderPass, UploadPass};
use crate::gfx::context::Context;
use crate::gfx::drawable::Drawable;
use crate::gfx::error::{RenderError, ResourceError};
use crate::gfx::types::RenderPasses;
use crate::tile::OverscaledTileId;
use std::collections::{BTreeMap, BTreeSet, HashMap};

type TileKey = (RenderPasses, OverscaledTileId);

/// A layer group whose drawables each belong to one tile.
///
/// Drawables are indexed by the pass they were added for and their tile, so a
/// tile leaving the view removes exactly its own drawables.
#[derive(Debug)]
pub struct TileLayerGroup {
    common: LayerGroupCommon,
    drawables: DrawableMap,
    index: HashMap<TileKey, Vec<DrawableKey>>,
    render_tiles: Vec<OverscaledTileId>,
}

impl TileLayerGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>, layer_index: i32) -> Self {
        Self {
            common: LayerGroupCommon::new(name, layer_index),
            drawables: BTreeMap::new(),
            index: HashMap::new(),
            render_tiles: Vec::new(),
        }
    }

    /// Takes ownership of `drawable` and files it under `(pass, tile_id)`. The
    /// drawable's tile id is set to `tile_id`.
    pub fn add_drawable(
        &mut self,
        pass: RenderPasses,
        tile_id: OverscaledTileId,
        mut drawable: Box<dyn Drawable>,
    ) {
        drawable.base_mut().set_tile_id(Some(tile_id));
        let key = DrawableKey::of(drawable.as_ref());
        self.drawables.insert(key, drawable);
        self.index.entry((pass, tile_id)).or_default().push(key);
    }

    /// Returns the drawables filed under `(pass, tile_id)`, in draw order.
    pub fn get_drawables(&self, pass: RenderPasses, tile_id: &OverscaledTileId) -> Vec<&dyn Drawable> {
        let Some(keys) = self.index.get(&(pass, *tile_id)) else {
            return Vec::new();
        };
        let mut keys = keys.clone();
        keys.sort();
        keys.iter()
            .filter_map(|k| self.drawables.get(k).map(|d| d.as_ref()))
            .collect()
    }

    /// Calls `f` on each drawable filed under `(pass, tile_id)`.
    pub fn visit_tile_drawables_mut(
        &mut self,
        pass: RenderPasses,
        tile_id: &OverscaledTileId,
        f: &mut dyn FnMut(&mut dyn Drawable),
    ) {
        if let Some(keys) = self.index.get(&(pass, *tile_id)) {
            for key in keys {
                if let Some(drawable) = self.drawables.get_mut(key) {
                    f(drawable.as_mut());
                }
            }
        }
    }

    /// Number of drawables filed under `(pass, tile_id)`.
    pub fn drawable_count_for(&self, pass: RenderPasses, tile_id: &OverscaledTileId) -> usize {
        self.index.get(&(pass, *tile_id)).map_or(0, Vec::len)
    }

    /// Removes and drops the drawables filed under `(pass, tile_id)`.
    pub fn remove_drawables(&mut self, pass: RenderPasses, tile_id: &OverscaledTileId) -> usize {
        let Some(keys) = self.index.remove(&(pass, *tile_id)) else {
            return 0;
        };
        keys.iter()
            .filter(|k| self.drawables.remove(*k).is_some())
            .count()
    }

    /// Tiles with at least one drawable this frame, in ascending order. Refreshed
    /// by `pre_render`.
    pub fn render_tiles(&self) -> &[OverscaledTileId] {
        &self.render_tiles
    }

    fn prune_index(&mut self) {
        let drawables = &self.drawables;
        self.index.retain(|_, keys| {
            keys.retain(|k| drawables.contains_key(k));
            !keys.is_empty()
        });
    }
}

impl LayerGroupBase for TileLayerGroup {
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
        let removed = before - self.drawables.len();
        if removed > 0 {
            self.prune_index();
        }
        removed
    }

    fn clear_drawables(&mut self) {
        self.drawables.clear();
        self.index.clear();
        self.render_tiles.clear();
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

    fn pre_render(&mut self, _context: &dyn Context, _parameters: &PaintParameters) {
        let tiles: BTreeSet<OverscaledTileId> = self.index.keys().map(|(_, tile)| *tile).collect();
        self.render_tiles = tiles.into_iter().collect();
    }
}
