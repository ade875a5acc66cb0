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

//! The unit of one GPU draw call.

use super::command::{RenderPass, UploadPass};
use super::error::{RenderError, ResourceError};
use super::shader::ShaderProgram;
use super::texture::Texture2D;
use super::types::{AttributeDataType, DepthMaskType, RenderPasses};
use super::uniform_buffer::UniformBufferArray;
use super::vertex_attribute::VertexAttributeArray;
use crate::renderer::PaintParameters;
use crate::tile::OverscaledTileId;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Largest vertex index a 16-bit index buffer can address.
pub const MAX_SEGMENT_VERTICES: usize = u16::MAX as usize;

static NEXT_DRAWABLE_ID: AtomicU64 = AtomicU64::new(1);

/// A contiguous range of a drawable's buffers drawn with one base vertex.
///
/// Indices inside a segment are relative to `vertex_offset`, which keeps them
/// within the 16-bit range even when the drawable holds more vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Segment {
    /// First vertex of the segment.
    pub vertex_offset: usize,
    /// First index of the segment.
    pub index_offset: usize,
    /// Number of vertices.
    pub vertex_length: usize,
    /// Number of indices.
    pub index_length: usize,
}

/// Mutates a single drawable before it is drawn each frame.
pub trait DrawableTweaker: Send + Sync + Debug {
    /// Runs once per frame before the drawable is drawn.
    fn execute(&self, drawable: &mut DrawableBase, parameters: &PaintParameters);
}

/// Backend-independent drawable state.
#[derive(Debug)]
pub struct DrawableBase {
    id: u64,
    name: String,
    shader: Option<Arc<dyn ShaderProgram>>,
    render_passes: RenderPasses,
    enabled: bool,
    tile_id: Option<OverscaledTileId>,
    draw_priority: i64,
    sub_layer_index: i32,
    depth_type: DepthMaskType,
    is_3d: bool,
    type_tag: u32,
    ubo_index: usize,
    textures: BTreeMap<usize, Arc<dyn Texture2D>>,
    vertex_attributes: Option<VertexAttributeArray>,
    uniform_buffers: UniformBufferArray,
    tweakers: Vec<Arc<dyn DrawableTweaker>>,
    vertex_data: Vec<u8>,
    vertex_count: usize,
    vertex_type: AttributeDataType,
    indices: Vec<u16>,
    segments: Vec<Segment>,
    needs_upload: bool,
}

impl DrawableBase {
    /// Creates an empty drawable with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_DRAWABLE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            shader: None,
            render_passes: RenderPasses::NONE,
            enabled: true,
            tile_id: None,
            draw_priority: 0,
            sub_layer_index: 0,
            depth_type: DepthMaskType::ReadOnly,
            is_3d: false,
            type_tag: 0,
            ubo_index: 0,
            textures: BTreeMap::new(),
            vertex_attributes: None,
            uniform_buffers: UniformBufferArray::default(),
            tweakers: Vec::new(),
            vertex_data: Vec::new(),
            vertex_count: 0,
            vertex_type: AttributeDataType::Short2,
            indices: Vec::new(),
            segments: Vec::new(),
            needs_upload: true,
        }
    }

    /// Unique id within the context.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Program used to draw.
    pub fn shader(&self) -> Option<&Arc<dyn ShaderProgram>> {
        self.shader.as_ref()
    }

    /// Replaces the program.
    pub fn set_shader(&mut self, shader: Option<Arc<dyn ShaderProgram>>) {
        self.shader = shader;
        self.needs_upload = true;
    }

    /// Passes the drawable takes part in.
    pub fn render_passes(&self) -> RenderPasses {
        self.render_passes
    }

    /// Sets the passes.
    pub fn set_render_passes(&mut self, passes: RenderPasses) {
        self.render_passes = passes;
    }

    /// Returns `true` if the drawable takes part in any of `pass`.
    pub fn has_render_pass(&self, pass: RenderPasses) -> bool {
        self.render_passes.intersects(pass)
    }

    /// Disabled drawables are skipped at draw time.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables drawing.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Tile the geometry belongs to, if any.
    pub fn tile_id(&self) -> Option<&OverscaledTileId> {
        self.tile_id.as_ref()
    }

    /// Sets the tile.
    pub fn set_tile_id(&mut self, tile_id: Option<OverscaledTileId>) {
        self.tile_id = tile_id;
    }

    /// Ordering key within a layer group.
    pub fn draw_priority(&self) -> i64 {
        self.draw_priority
    }

    /// Sets the ordering key.
    pub fn set_draw_priority(&mut self, priority: i64) {
        self.draw_priority = priority;
    }

    /// Sub-layer within the style layer.
    pub fn sub_layer_index(&self) -> i32 {
        self.sub_layer_index
    }

    /// Sets the sub-layer.
    pub fn set_sub_layer_index(&mut self, index: i32) {
        self.sub_layer_index = index;
    }

    /// Depth write mode.
    pub fn depth_type(&self) -> DepthMaskType {
        self.depth_type
    }

    /// Sets the depth write mode.
    pub fn set_depth_type(&mut self, depth_type: DepthMaskType) {
        self.depth_type = depth_type;
    }

    /// Whether depth testing applies.
    pub fn is_3d(&self) -> bool {
        self.is_3d
    }

    /// Turns depth testing on or off.
    pub fn set_is_3d(&mut self, is_3d: bool) {
        self.is_3d = is_3d;
    }

    /// Tag tweakers use to tell apart drawables of one layer (e.g. fill vs outline).
    pub fn type_tag(&self) -> u32 {
        self.type_tag
    }

    /// Sets the type tag.
    pub fn set_type_tag(&mut self, tag: u32) {
        self.type_tag = tag;
    }

    /// Index of this drawable's entry in a layer-wide uniform array.
    pub fn ubo_index(&self) -> usize {
        self.ubo_index
    }

    /// Sets the index in the layer uniform array.
    pub fn set_ubo_index(&mut self, index: usize) {
        self.ubo_index = index;
    }

    /// Texture bound to `slot`.
    pub fn texture(&self, slot: usize) -> Option<&Arc<dyn Texture2D>> {
        self.textures.get(&slot)
    }

    /// All bound textures, by slot.
    pub fn textures(&self) -> &BTreeMap<usize, Arc<dyn Texture2D>> {
        &self.textures
    }

    /// Binds `texture` to `slot`; `None` unbinds it.
    pub fn set_texture(&mut self, slot: usize, texture: Option<Arc<dyn Texture2D>>) {
        match texture {
            Some(texture) => {
                self.textures.insert(slot, texture);
            }
            None => {
                self.textures.remove(&slot);
            }
        }
    }

    /// Per-drawable attribute overrides.
    pub fn vertex_attributes(&self) -> Option<&VertexAttributeArray> {
        self.vertex_attributes.as_ref()
    }

    /// Attribute overrides, mutably.
    pub fn vertex_attributes_mut(&mut self) -> Option<&mut VertexAttributeArray> {
        self.vertex_attributes.as_mut()
    }

    /// Replaces the attribute overrides.
    pub fn set_vertex_attributes(&mut self, attributes: Option<VertexAttributeArray>) {
        self.vertex_attributes = attributes;
        self.needs_upload = true;
    }

    /// Drawable-level uniform blocks.
    pub fn uniform_buffers(&self) -> &UniformBufferArray {
        &self.uniform_buffers
    }

    /// Drawable-level uniform blocks, mutably.
    pub fn uniform_buffers_mut(&mut self) -> &mut UniformBufferArray {
        &mut self.uniform_buffers
    }

    /// Tweakers run before each draw.
    pub fn tweakers(&self) -> &[Arc<dyn DrawableTweaker>] {
        &self.tweakers
    }

    /// Appends a tweaker.
    pub fn add_tweaker(&mut self, tweaker: Arc<dyn DrawableTweaker>) {
        self.tweakers.push(tweaker);
    }

    /// Removes every tweaker.
    pub fn clear_tweakers(&mut self) {
        self.tweakers.clear();
    }

    /// Runs every tweaker attached to this drawable.
    pub fn run_tweakers(&mut self, parameters: &PaintParameters) {
        let tweakers = self.tweakers.clone();
        for tweaker in &tweakers {
            tweaker.execute(self, parameters);
        }
    }

    /// Interleaved position vertices.
    pub fn vertex_data(&self) -> &[u8] {
        &self.vertex_data
    }

    /// Number of vertices in the raw data.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Layout of one raw vertex.
    pub fn vertex_type(&self) -> AttributeDataType {
        self.vertex_type
    }

    /// Replaces the position vertices. `data` holds `count` elements of `vertex_type`.
    pub fn set_vertex_data(&mut self, data: Vec<u8>, count: usize, vertex_type: AttributeDataType) {
        debug_assert_eq!(data.len(), count * vertex_type.size());
        self.vertex_data = data;
        self.vertex_count = count;
        self.vertex_type = vertex_type;
        self.needs_upload = true;
    }

    /// Index data.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Draw ranges over the indices.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Replaces the index data and the segments that partition it.
    pub fn set_index_data(&mut self, indices: Vec<u16>, segments: Vec<Segment>) {
        debug_assert_eq!(
            segments.iter().map(|s| s.index_length).sum::<usize>(),
            indices.len()
        );
        self.indices = indices;
        self.segments = segments;
        self.needs_upload = true;
    }

    /// Number of triangles drawn.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if CPU data changed since the last upload.
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
            || self
                .vertex_attributes
                .as_ref()
                .is_some_and(VertexAttributeArray::is_dirty)
    }

    /// Marks the CPU data as uploaded.
    pub fn mark_uploaded(&mut self) {
        self.needs_upload = false;
        if let Some(attrs) = self.vertex_attributes.as_mut() {
            attrs.clear_dirty();
        }
    }
}

/// A backend drawable: shared state plus the GPU objects made from it.
///
/// Owned by exactly one layer group; dropping it releases its GPU buffers, so
/// it must be dropped on the render thread.
pub trait Drawable: Send + Debug {
    /// Shared state.
    fn base(&self) -> &DrawableBase;

    /// Shared state, mutably.
    fn base_mut(&mut self) -> &mut DrawableBase;

    /// Creates or refreshes GPU buffers from the CPU data when it changed.
    fn upload(&mut self, pass: &mut dyn UploadPass) -> Result<(), ResourceError>;

    /// Records the draw call. Drawable uniforms take precedence over
    /// `layer_uniforms` for the same block id.
    fn draw(
        &mut self,
        pass: &mut dyn RenderPass,
        layer_uniforms: &UniformBufferArray,
        parameters: &PaintParameters,
    ) -> Result<(), RenderError>;

    fn id(&self) -> u64 {
        self.base().id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn has_render_pass(&self, pass: RenderPasses) -> bool {
        self.base().has_render_pass(pass)
    }

    fn tile_id(&self) -> Option<&OverscaledTileId> {
        self.base().tile_id()
    }

    fn draw_priority(&self) -> i64 {
        self.base().draw_priority()
    }
}
