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

//! CPU geometry of one layer in one tile, and the GPU buffers made from it.

use crate::gfx::buffer::{BufferResource, BufferUsage};
use crate::gfx::command::UploadPass;
use crate::gfx::drawable::{Segment, MAX_SEGMENT_VERTICES};
use crate::gfx::drawable_builder::{DrawableBuilder, TilePoint};
use crate::gfx::error::ResourceError;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Parsed geometry for one style layer of one tile.
///
/// Buckets are built on a worker thread and carry no GPU state until
/// [`upload`](Self::upload) runs. From then on the bucket is tagged with the
/// uploading thread and must be dropped there.
#[derive(Debug)]
pub struct Bucket {
    layer_id: String,
    vertices: Vec<TilePoint>,
    indices: Vec<u16>,
    segments: Vec<Segment>,
    vertex_buffer: Option<Arc<dyn BufferResource>>,
    index_buffer: Option<Arc<dyn BufferResource>>,
    render_thread: Option<ThreadId>,
}

impl Bucket {
    /// Creates a bucket from parsed geometry. Segment indices are relative to
    /// the segment's first vertex.
    pub fn new(
        layer_id: impl Into<String>,
        vertices: Vec<TilePoint>,
        indices: Vec<u16>,
        segments: Vec<Segment>,
    ) -> Self {
        Self {
            layer_id: layer_id.into(),
            vertices,
            indices,
            segments,
            vertex_buffer: None,
            index_buffer: None,
            render_thread: None,
        }
    }

    /// A bucket holding a single segment.
    pub fn from_geometry(layer_id: impl Into<String>, vertices: Vec<TilePoint>, indices: Vec<u16>) -> Self {
        let segment = Segment {
            vertex_offset: 0,
            index_offset: 0,
            vertex_length: vertices.len(),
            index_length: indices.len(),
        };
        Self::new(layer_id, vertices, indices, vec![segment])
    }

    /// Style layer the geometry belongs to.
    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    /// Tile-local vertex positions.
    pub fn vertices(&self) -> &[TilePoint] {
        &self.vertices
    }

    /// Triangle indices, relative to their segment.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Draw ranges over `indices`.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` if the bucket holds at least one triangle.
    pub fn has_data(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Returns `true` once GPU buffers exist.
    pub fn is_uploaded(&self) -> bool {
        self.render_thread.is_some()
    }

    /// The thread that uploaded the bucket.
    pub fn render_thread(&self) -> Option<ThreadId> {
        self.render_thread
    }

    /// GPU vertex buffer, once uploaded.
    pub fn vertex_buffer(&self) -> Option<&Arc<dyn BufferResource>> {
        self.vertex_buffer.as_ref()
    }

    /// GPU index buffer, once uploaded.
    pub fn index_buffer(&self) -> Option<&Arc<dyn BufferResource>> {
        self.index_buffer.as_ref()
    }

    /// Creates the GPU buffers and tags the bucket with the calling thread. Does
    /// nothing if already uploaded.
    pub fn upload(&mut self, pass: &mut dyn UploadPass) -> Result<(), ResourceError> {
        if self.is_uploaded() || !self.has_data() {
            return Ok(());
        }
        let vertex_buffer = pass.create_buffer(
            &self.layer_id,
            bytemuck::cast_slice(&self.vertices),
            BufferUsage::VERTEX | BufferUsage::COPY_DST,
        )?;
        let index_buffer = pass.create_buffer(
            &self.layer_id,
            bytemuck::cast_slice(&self.indices),
            BufferUsage::INDEX | BufferUsage::COPY_DST,
        )?;
        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        self.render_thread = Some(thread::current().id());
        Ok(())
    }

    /// Emits every segment into `builder`, one `add_vertices` call per segment.
    ///
    /// Segments reaching past the geometry, or indexing past their own
    /// vertices, are skipped.
    pub fn emit_into(&self, builder: &mut DrawableBuilder<'_>) {
        for segment in &self.segments {
            let vertices = segment
                .vertex_offset
                .checked_add(segment.vertex_length)
                .and_then(|end| self.vertices.get(segment.vertex_offset..end));
            let indices = segment
                .index_offset
                .checked_add(segment.index_length)
                .and_then(|end| self.indices.get(segment.index_offset..end));
            match (vertices, indices) {
                (Some(vertices), Some(indices))
                    if vertices.len() <= MAX_SEGMENT_VERTICES
                        && indices.iter().all(|i| usize::from(*i) < vertices.len()) =>
                {
                    builder.add_vertices(vertices, indices)
                }
                _ => log::warn!(
                    "Skipping segment of '{}' outside its {} vertices and {} indices",
                    self.layer_id,
                    self.vertices.len(),
                    self.indices.len()
                ),
            }
        }
    }
}

impl Drop for Bucket {
    fn drop(&mut self) {
        if let Some(owner) = self.render_thread {
            debug_assert_eq!(
                owner,
                thread::current().id(),
                "bucket '{}' dropped off its render thread",
                self.layer_id
            );
        }
    }
}
