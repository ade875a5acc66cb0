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


//! The wgpu drawable: per-attribute vertex buffers and indexed draws.

use super::buffer::{WgpuBuffer, WgpuUniformBuffer};
use super::command::WgpuRenderPass;
use super::conversions::IntoWgpu;
use super::device::WgpuDevice;
use super::shader::{PipelineKey, VertexBufferKey, WgpuShaderProgram};
use super::texture::WgpuTexture2D;
use cartograph_core::gfx::buffer::{BufferResource, BufferUsage};
use cartograph_core::gfx::command::{RenderPass, UploadPass};
use cartograph_core::gfx::drawable::{Drawable, DrawableBase};
use cartograph_core::gfx::error::{RenderError, ResourceError};
use cartograph_core::gfx::types::{AttributeDataType, DepthMaskType, RenderPasses};
use cartograph_core::gfx::uniform_buffer::UniformBufferArray;
use cartograph_core::gfx::shader::ShaderProgram;
use cartograph_core::gfx::vertex_attribute::VertexAttribute;
use cartograph_core::renderer::PaintParameters;
use std::sync::Arc;

/// wgpu requires vertex strides to be multiples of this.
const VERTEX_STRIDE_ALIGNMENT: usize = 4;

#[derive(Debug)]
struct VertexBinding {
    name: String,
    buffer: Arc<dyn BufferResource>,
    key: VertexBufferKey,
}

/// A drawable whose buffers are created through the frame's upload pass.
///
/// Every attribute gets its own vertex buffer, bound in location order. An
/// attribute holding a single item is bound with a zero stride and acts as a
/// constant.
#[derive(Debug)]
pub struct WgpuDrawable {
    base: DrawableBase,
    device: Arc<WgpuDevice>,
    index_buffer: Option<Arc<dyn BufferResource>>,
    bindings: Vec<VertexBinding>,
}

impl WgpuDrawable {
    /// Creates an empty drawable.
    pub fn new(device: Arc<WgpuDevice>, name: &str) -> Self {
        device.stats().drawable_created();
        Self {
            base: DrawableBase::new(name),
            device,
            index_buffer: None,
            bindings: Vec::new(),
        }
    }

    /// Number of vertex buffers bound at draw time.
    pub fn vertex_buffer_count(&self) -> usize {
        self.bindings.len()
    }

    fn upload_vertex_buffers(&mut self, pass: &mut dyn UploadPass) -> Result<(), ResourceError> {
        let Some(shader) = self.base.shader().cloned() else {
            self.bindings.clear();
            return Ok(());
        };

        let vertex_count = self.base.vertex_count();
        let mut sources: Vec<(String, u32, AttributeDataType, Vec<u8>, usize)> = Vec::new();
        shader
            .vertex_attributes()
            .resolve(self.base.vertex_attributes(), |name, default, override_attr| {
                let attr = override_attr.unwrap_or(default);
                if attr.index() == 0 && override_attr.is_none() && vertex_count > 0 {
                    sources.push((
                        name.to_string(),
                        0,
                        self.base.vertex_type(),
                        self.base.vertex_data().to_vec(),
                        vertex_count,
                    ));
                    return;
                }
                let (bytes, count) = attribute_bytes(attr);
                sources.push((name.to_string(), attr.index(), attr.data_type(), bytes, count));
            });
        sources.sort_by_key(|(_, location, ..)| *location);

        let mut previous = std::mem::take(&mut self.bindings);
        for (name, location, data_type, bytes, count) in sources {
            let (data, stride) = pack(&bytes, data_type.size(), count, vertex_count);
            let slot = previous
                .iter()
                .position(|b| b.name == name)
                .map(|i| previous.swap_remove(i).buffer);
            let label = format!("{} {}", self.base.name(), name);
            let buffer = emplace_buffer(pass, slot, &label, &data, BufferUsage::VERTEX)?;
            self.bindings.push(VertexBinding {
                name,
                buffer,
                key: VertexBufferKey {
                    stride: stride as u64,
                    location,
                    format: data_type.into_wgpu(),
                },
            });
        }
        Ok(())
    }
}

impl Drop for WgpuDrawable {
    fn drop(&mut self) {
        self.device.stats().drawable_released();
    }
}

impl Drawable for WgpuDrawable {
    fn base(&self) -> &DrawableBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DrawableBase {
        &mut self.base
    }

    fn upload(&mut self, pass: &mut dyn UploadPass) -> Result<(), ResourceError> {
        if !self.base.needs_upload() {
            return Ok(());
        }

        if self.base.indices().is_empty() {
            self.index_buffer = None;
        } else {
            let indices: Vec<u8> = bytemuck::cast_slice(self.base.indices()).to_vec();
            let label = format!("{} indices", self.base.name());
            self.index_buffer = Some(emplace_buffer(
                pass,
                self.index_buffer.take(),
                &label,
                &indices,
                BufferUsage::INDEX,
            )?);
        }

        self.upload_vertex_buffers(pass)?;
        self.base.mark_uploaded();
        Ok(())
    }

    fn draw(
        &mut self,
        pass: &mut dyn RenderPass,
        layer_uniforms: &UniformBufferArray,
        parameters: &PaintParameters,
    ) -> Result<(), RenderError> {
        if !self.base.is_enabled() || self.base.segments().is_empty() {
            return Ok(());
        }
        let Some(index_buffer) = self
            .index_buffer
            .as_ref()
            .and_then(|b| b.as_any().downcast_ref::<WgpuBuffer>())
        else {
            log::warn!("Drawable '{}' drawn before upload", self.base.name());
            return Ok(());
        };
        let Some(shader) = self.base.shader() else {
            log::warn!("Drawable '{}' has no shader", self.base.name());
            return Ok(());
        };
        let Some(program) = shader.as_any().downcast_ref::<WgpuShaderProgram>() else {
            return Err(RenderError::Resource(ResourceError::BackendError(format!(
                "program '{}' was not created by the wgpu backend",
                shader.name()
            ))));
        };
        let Some(wgpu_pass) = pass.as_any_mut().downcast_mut::<WgpuRenderPass>() else {
            return Err(RenderError::Resource(ResourceError::BackendError(
                "render pass was not created by the wgpu backend".to_string(),
            )));
        };

        // Drawable uniforms shadow the layer's for the same block.
        let mut uniforms: Vec<(usize, &wgpu::Buffer)> = Vec::new();
        for block in program.uniform_blocks() {
            let buffer = self
                .base
                .uniform_buffers()
                .get(block.id)
                .or_else(|| layer_uniforms.get(block.id))
                .and_then(|b| b.as_any().downcast_ref::<WgpuUniformBuffer>());
            match buffer {
                Some(buffer) => uniforms.push((block.id, buffer.wgpu_buffer())),
                None => {
                    log::warn!(
                        "Drawable '{}' skipped: uniform block '{}' is not bound",
                        self.base.name(),
                        block.name
                    );
                    return Ok(());
                }
            }
        }
        let Some(uniform_group) = program.uniform_bind_group(&uniforms) else {
            return Ok(());
        };

        let texture_group = if program.texture_count() > 0 {
            let textures: Vec<_> = (0..program.texture_count())
                .map(|slot| {
                    self.base
                        .texture(slot)
                        .and_then(|t| t.as_any().downcast_ref::<WgpuTexture2D>())
                        .and_then(WgpuTexture2D::binding)
                })
                .collect();
            match program.texture_bind_group(&textures) {
                Some(group) => Some(group),
                None => {
                    log::warn!("Drawable '{}' skipped: missing texture", self.base.name());
                    return Ok(());
                }
            }
        } else {
            None
        };

        let mut vertex_buffers = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            match binding.buffer.as_any().downcast_ref::<WgpuBuffer>() {
                Some(buffer) => vertex_buffers.push(buffer.wgpu_buffer()),
                None => {
                    return Err(RenderError::Resource(ResourceError::BackendError(format!(
                        "vertex buffer '{}' was not created by the wgpu backend",
                        binding.name
                    ))))
                }
            }
        }

        let opaque = parameters.render_pass.contains(RenderPasses::OPAQUE);
        let key = PipelineKey {
            buffers: self.bindings.iter().map(|b| b.key).collect(),
            color_format: wgpu_pass.color_format(),
            translucent: parameters.render_pass.contains(RenderPasses::TRANSLUCENT),
            depth_write: opaque && self.base.depth_type() == DepthMaskType::ReadWrite,
            depth_test: self.base.is_3d(),
        };
        let pipeline = program.pipeline(&key);

        let native = wgpu_pass.native_mut();
        native.set_pipeline(&pipeline);
        native.set_bind_group(0, &uniform_group, &[]);
        if let Some(group) = &texture_group {
            native.set_bind_group(1, group, &[]);
        }
        for (slot, buffer) in vertex_buffers.iter().enumerate() {
            native.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
        native.set_index_buffer(
            index_buffer.wgpu_buffer().slice(..),
            wgpu::IndexFormat::Uint16,
        );

        for segment in self.base.segments() {
            if segment.index_length == 0 {
                continue;
            }
            let start = segment.index_offset as u32;
            let end = start + segment.index_length as u32;
            native.draw_indexed(start..end, segment.vertex_offset as i32, 0..1);
            self.device
                .stats()
                .record_draw((segment.index_length / 3) as u64);
        }
        Ok(())
    }
}

/// Reuses `slot` when it has the right size, otherwise creates a new buffer.
fn emplace_buffer(
    pass: &mut dyn UploadPass,
    slot: Option<Arc<dyn BufferResource>>,
    label: &str,
    data: &[u8],
    usage: BufferUsage,
) -> Result<Arc<dyn BufferResource>, ResourceError> {
    match slot {
        Some(buffer) if buffer.size() == data.len() => {
            pass.update_buffer(buffer.as_ref(), data)?;
            Ok(buffer)
        }
        _ => pass.create_buffer(label, data, usage | BufferUsage::COPY_DST),
    }
}

/// Returns tightly packed elements and the number of vertices they cover.
fn attribute_bytes(attr: &VertexAttribute) -> (Vec<u8>, usize) {
    let element = attr.data_type().size();
    match attr.shared_raw_data() {
        Some(shared) => {
            let stride = attr.stride().max(element);
            let mut out = Vec::with_capacity(shared.vertex_count * element);
            for i in 0..shared.vertex_count {
                let start = shared.offset + i * stride;
                match shared.bytes.get(start..start + element) {
                    Some(chunk) => out.extend_from_slice(chunk),
                    None => break,
                }
            }
            let count = out.len() / element;
            (out, count)
        }
        None => {
            let count = attr.count().max(1);
            let mut out = attr.raw_data();
            out.resize(count * element, 0);
            (out, count)
        }
    }
}

/// Lays `count` elements out at an aligned stride.
///
/// One element becomes a constant with stride zero. Per-vertex data shorter
/// than `vertex_count` is zero-filled so every index stays in bounds.
fn pack(bytes: &[u8], element: usize, count: usize, vertex_count: usize) -> (Vec<u8>, usize) {
    let stride = element.next_multiple_of(VERTEX_STRIDE_ALIGNMENT);
    let mut out: Vec<u8> = if stride == element {
        bytes.to_vec()
    } else {
        bytes
            .chunks(element)
            .flat_map(|chunk| {
                let mut padded = chunk.to_vec();
                padded.resize(stride, 0);
                padded
            })
            .collect()
    };
    if count <= 1 {
        out.resize(stride, 0);
        return (out, 0);
    }
    out.resize(count.max(vertex_count) * stride, 0);
    (out, stride)
}
