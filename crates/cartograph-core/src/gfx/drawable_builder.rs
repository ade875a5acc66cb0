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

//! Incremental construction of drawables from primitive geometry.

use super::context::Context;
use super::drawable::{Drawable, DrawableTweaker, Segment, MAX_SEGMENT_VERTICES};
use super::shader::ShaderProgram;
use super::texture::Texture2D;
use super::types::{AttributeDataType, DepthMaskType, RenderPasses};
use super::vertex_attribute::VertexAttributeArray;
use crate::tile::OverscaledTileId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A position in tile coordinates.
pub type TilePoint = [i16; 2];

/// Builds one or more drawables from triangles and quads.
///
/// Geometry accumulates for the current drawable until [`flush`](Self::flush)
/// seals it. Settings (shader, passes, tweakers...) are copied onto every
/// drawable the builder creates, at creation time.
pub struct DrawableBuilder<'a> {
    context: &'a dyn Context,
    name: String,
    shader: Option<Arc<dyn ShaderProgram>>,
    render_passes: RenderPasses,
    enabled: bool,
    depth_type: DepthMaskType,
    is_3d: bool,
    draw_priority: i64,
    sub_layer_index: i32,
    type_tag: u32,
    tile_id: Option<OverscaledTileId>,
    vertex_attributes: Option<VertexAttributeArray>,
    textures: BTreeMap<usize, Arc<dyn Texture2D>>,
    tweakers: Vec<Arc<dyn DrawableTweaker>>,

    current: Option<Box<dyn Drawable>>,
    drawables: Vec<Box<dyn Drawable>>,

    vertex_type: AttributeDataType,
    vertices: Vec<u8>,
    vertex_count: usize,
    indices: Vec<u16>,
    segments: Vec<Segment>,
}

impl<'a> DrawableBuilder<'a> {
    /// Creates a builder whose drawables come from `context`.
    pub fn new(context: &'a dyn Context, name: impl Into<String>) -> Self {
        Self {
            context,
            name: name.into(),
            shader: None,
            render_passes: RenderPasses::NONE,
            enabled: true,
            depth_type: DepthMaskType::ReadOnly,
            is_3d: false,
            draw_priority: 0,
            sub_layer_index: 0,
            type_tag: 0,
            tile_id: None,
            vertex_attributes: None,
            textures: BTreeMap::new(),
            tweakers: Vec::new(),
            current: None,
            drawables: Vec::new(),
            vertex_type: AttributeDataType::Short2,
            vertices: Vec::new(),
            vertex_count: 0,
            indices: Vec::new(),
            segments: Vec::new(),
        }
    }

    /// Name given to every drawable produced.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Program of the drawables built from now on.
    pub fn set_shader(&mut self, shader: Arc<dyn ShaderProgram>) {
        self.shader = Some(shader);
    }

    /// Passes the next drawables take part in.
    pub fn set_render_passes(&mut self, passes: RenderPasses) {
        self.render_passes = passes;
    }

    /// Initial enabled flag of the next drawables.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Depth write mode of the next drawables.
    pub fn set_depth_type(&mut self, depth_type: DepthMaskType) {
        self.depth_type = depth_type;
    }

    /// Whether the next drawables are depth tested.
    pub fn set_is_3d(&mut self, is_3d: bool) {
        self.is_3d = is_3d;
    }

    /// Draw priority of the next drawables.
    pub fn set_draw_priority(&mut self, priority: i64) {
        self.draw_priority = priority;
    }

    /// Sub-layer index of the next drawables.
    pub fn set_sub_layer_index(&mut self, index: i32) {
        self.sub_layer_index = index;
    }

    /// Type tag of the next drawables.
    pub fn set_type_tag(&mut self, tag: u32) {
        self.type_tag = tag;
    }

    /// Tile of the next drawables.
    pub fn set_tile_id(&mut self, tile_id: Option<OverscaledTileId>) {
        self.tile_id = tile_id;
    }

    /// Attribute overrides applied to subsequent drawables.
    pub fn set_vertex_attributes(&mut self, attributes: Option<VertexAttributeArray>) {
        self.vertex_attributes = attributes;
    }

    /// Binds `texture` to `slot` on the next drawables.
    pub fn set_texture(&mut self, slot: usize, texture: Arc<dyn Texture2D>) {
        self.textures.insert(slot, texture);
    }

    /// Attaches `tweaker` to every drawable created from now on.
    pub fn add_tweaker(&mut self, tweaker: Arc<dyn DrawableTweaker>) {
        self.tweakers.push(tweaker);
    }

    /// Forgets the tweakers added so far.
    pub fn clear_tweakers(&mut self) {
        self.tweakers.clear();
    }

    fn create_drawable(&self) -> Box<dyn Drawable> {
        let mut drawable = self.context.create_drawable(&self.name);
        let base = drawable.base_mut();
        base.set_shader(self.shader.clone());
        base.set_render_passes(self.render_passes);
        base.set_enabled(self.enabled);
        base.set_depth_type(self.depth_type);
        base.set_is_3d(self.is_3d);
        base.set_draw_priority(self.draw_priority);
        base.set_sub_layer_index(self.sub_layer_index);
        base.set_type_tag(self.type_tag);
        base.set_tile_id(self.tile_id);
        base.set_vertex_attributes(self.vertex_attributes.clone());
        for (slot, texture) in &self.textures {
            base.set_texture(*slot, Some(texture.clone()));
        }
        for tweaker in &self.tweakers {
            base.add_tweaker(tweaker.clone());
        }
        drawable
    }

    /// Returns the drawable being built, creating one if `create_if_none` is set.
    pub fn get_current_drawable(&mut self, create_if_none: bool) -> Option<&mut dyn Drawable> {
        if self.current.is_none() && create_if_none {
            self.current = Some(self.create_drawable());
        }
        match &mut self.current {
            Some(drawable) => Some(drawable.as_mut()),
            None => None,
        }
    }

    /// Drops the in-progress drawable and its accumulated geometry.
    pub fn reset_current_drawable(&mut self) {
        self.current = None;
        self.reset_geometry();
    }

    fn reset_geometry(&mut self) {
        self.vertex_type = AttributeDataType::Short2;
        self.vertices.clear();
        self.vertex_count = 0;
        self.indices.clear();
        self.segments.clear();
    }

    /// Vertices accumulated for the current drawable.
    pub fn cur_vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Indices accumulated for the current drawable.
    pub fn cur_index_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns the segment that can take `vertices` more vertices, opening a new
    /// one when the 16-bit index range would overflow.
    fn segment_for(&mut self, vertices: usize) -> usize {
        let needs_new = match self.segments.last() {
            Some(segment) => segment.vertex_length + vertices > MAX_SEGMENT_VERTICES,
            None => true,
        };
        if needs_new {
            self.segments.push(Segment {
                vertex_offset: self.vertex_count,
                index_offset: self.indices.len(),
                vertex_length: 0,
                index_length: 0,
            });
        }
        self.segments.len() - 1
    }

    fn push_vertex(&mut self, point: TilePoint) {
        debug_assert_eq!(self.vertex_type, AttributeDataType::Short2);
        self.vertices.extend_from_slice(&point[0].to_le_bytes());
        self.vertices.extend_from_slice(&point[1].to_le_bytes());
        self.vertex_count += 1;
    }

    fn emit(&mut self, points: &[TilePoint], relative_indices: &[u16]) {
        self.get_current_drawable(true);
        let seg = self.segment_for(points.len());
        let base = self.segments[seg].vertex_length as u16;
        for point in points {
            self.push_vertex(*point);
        }
        self.indices
            .extend(relative_indices.iter().map(|i| base + *i));
        let segment = &mut self.segments[seg];
        segment.vertex_length += points.len();
        segment.index_length += relative_indices.len();
    }

    /// Adds a triangle with three new vertices.
    pub fn add_triangle(&mut self, a: TilePoint, b: TilePoint, c: TilePoint) {
        self.emit(&[a, b, c], &[0, 1, 2]);
    }

    /// Adds a triangle made of the previous two vertices and `c`.
    ///
    /// Falls back to re-emitting the shared vertices when the current segment is
    /// full. Without two previous vertices there is nothing to append to and the
    /// call is ignored.
    pub fn append_triangle(&mut self, c: TilePoint) {
        let Some(last) = self.segments.last().copied() else {
            log::warn!("append_triangle on '{}' without a previous triangle", self.name);
            return;
        };
        if last.vertex_length < 2 {
            log::warn!("append_triangle on '{}' without a previous triangle", self.name);
            return;
        }
        if last.vertex_length + 1 > MAX_SEGMENT_VERTICES {
            let a = self.vertex_at(self.vertex_count - 2);
            let b = self.vertex_at(self.vertex_count - 1);
            self.add_triangle(a, b, c);
            return;
        }
        let n = last.vertex_length as u16;
        self.push_vertex(c);
        self.indices.extend_from_slice(&[n - 2, n - 1, n]);
        if let Some(segment) = self.segments.last_mut() {
            segment.vertex_length += 1;
            segment.index_length += 3;
        }
    }

    fn vertex_at(&self, i: usize) -> TilePoint {
        let o = i * 4;
        [
            i16::from_le_bytes([self.vertices[o], self.vertices[o + 1]]),
            i16::from_le_bytes([self.vertices[o + 2], self.vertices[o + 3]]),
        ]
    }

    /// Adds an axis-aligned quad as two triangles sharing four vertices.
    pub fn add_quad(&mut self, x0: i16, y0: i16, x1: i16, y1: i16) {
        self.emit(
            &[[x0, y0], [x1, y0], [x0, y1], [x1, y1]],
            &[0, 1, 2, 1, 3, 2],
        );
    }

    /// Adds indexed geometry. `indices` are relative to the first of `vertices`.
    pub fn add_vertices(&mut self, vertices: &[TilePoint], indices: &[u16]) {
        debug_assert!(vertices.len() <= MAX_SEGMENT_VERTICES);
        debug_assert!(indices.iter().all(|i| (*i as usize) < vertices.len()));
        self.emit(vertices, indices);
    }

    /// Replaces the accumulated vertices with prebuilt interleaved data.
    pub fn set_raw_vertices(&mut self, data: Vec<u8>, count: usize, vertex_type: AttributeDataType) {
        debug_assert_eq!(data.len(), count * vertex_type.size());
        self.get_current_drawable(true);
        self.vertices = data;
        self.vertex_count = count;
        self.vertex_type = vertex_type;
    }

    /// Seals the current drawable into the completed list.
    ///
    /// The next primitive starts a new drawable. Without accumulated vertices
    /// nothing is sealed.
    pub fn flush(&mut self) {
        if self.vertex_count > 0 {
            if let Some(mut drawable) = self.current.take() {
                let base = drawable.base_mut();
                base.set_vertex_data(
                    std::mem::take(&mut self.vertices),
                    self.vertex_count,
                    self.vertex_type,
                );
                base.set_index_data(
                    std::mem::take(&mut self.indices),
                    std::mem::take(&mut self.segments),
                );
                self.drawables.push(drawable);
            }
        }
        self.current = None;
        self.reset_geometry();
    }

    /// Sealed drawables.
    pub fn drawables(&self) -> &[Box<dyn Drawable>] {
        &self.drawables
    }

    /// Drops every sealed drawable.
    pub fn clear_drawables(&mut self) {
        self.drawables.clear();
    }

    /// Hands the sealed drawables to the caller.
    pub fn take_drawables(&mut self) -> Vec<Box<dyn Drawable>> {
        std::mem::take(&mut self.drawables)
    }
}
