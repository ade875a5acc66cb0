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


//! Specialized programs: one WGSL module plus the pipelines built from it.

use super::device::WgpuDevice;
use super::renderable::DEPTH_FORMAT;
use cartograph_core::gfx::error::ShaderError;
use cartograph_core::gfx::shader::{
    default_vertex_attributes, preprocess, Define, ProgramSource, ShaderProgram, UniformBlockInfo,
};
use cartograph_core::gfx::uniform_buffer::UniformBlockId;
use cartograph_core::gfx::vertex_attribute::VertexAttributeArray;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Entry point of the vertex stage in every built-in module.
pub const VERTEX_ENTRY_POINT: &str = "vs_main";
/// Entry point of the fragment stage in every built-in module.
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Prefix of the definitions that promote a property to a uniform.
const UNIFORM_DEFINE_PREFIX: &str = "HAS_UNIFORM_u_";

/// Layout of one per-attribute vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferKey {
    /// Bytes between vertices; zero for a constant.
    pub stride: u64,
    /// Shader location.
    pub location: u32,
    /// Component format.
    pub format: wgpu::VertexFormat,
}

/// Everything a draw call changes about a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    /// Vertex buffers in binding order, position first.
    pub buffers: Vec<VertexBufferKey>,
    /// Format of the color attachment.
    pub color_format: wgpu::TextureFormat,
    /// Blends with premultiplied alpha when set.
    pub translucent: bool,
    /// Writes depth.
    pub depth_write: bool,
    /// Compares against stored depth; otherwise every fragment passes.
    pub depth_test: bool,
}

/// A compiled WGSL program.
///
/// Uniform blocks live in bind group 0 at `binding = block id`. Textures live
/// in bind group 1: slot `i` takes bindings `2i` (view) and `2i + 1` (sampler).
pub struct WgpuShaderProgram {
    name: String,
    device: Arc<WgpuDevice>,
    module: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: Option<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
    attributes: VertexAttributeArray,
    uniform_blocks: Vec<UniformBlockInfo>,
    texture_count: usize,
    pipelines: Mutex<HashMap<PipelineKey, wgpu::RenderPipeline>>,
}

impl fmt::Debug for WgpuShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuShaderProgram")
            .field("name", &self.name)
            .field("uniform_blocks", &self.uniform_blocks)
            .field("texture_count", &self.texture_count)
            .field("pipelines", &self.pipeline_count())
            .finish()
    }
}

impl WgpuShaderProgram {
    /// Preprocesses and compiles one specialization of `source`.
    pub fn new(
        device: Arc<WgpuDevice>,
        name: &str,
        source: &ProgramSource,
        defines: &[Define],
        first_attrib_name: &str,
    ) -> Result<Self, ShaderError> {
        if source.vertex.trim().is_empty() {
            return Err(ShaderError::MissingSource {
                shader: name.to_string(),
                stage: "vertex",
            });
        }
        if source.fragment.trim().is_empty() {
            return Err(ShaderError::MissingSource {
                shader: name.to_string(),
                stage: "fragment",
            });
        }

        let vertex = preprocess(name, &source.vertex, defines)?;
        let fragment = preprocess(name, &source.fragment, defines)?;
        let wgsl = format!("{vertex}\n{fragment}");

        let module = device
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(wgsl.into()),
            });
        check_compilation(name, &module)?;

        let promoted: BTreeSet<&str> = defines
            .iter()
            .filter_map(|d| d.name.strip_prefix(UNIFORM_DEFINE_PREFIX))
            .collect();
        let attributes = default_vertex_attributes(source, |p| promoted.contains(p));
        if attributes.get(first_attrib_name).is_none() {
            return Err(ShaderError::MissingAttribute {
                shader: name.to_string(),
                attribute: first_attrib_name.to_string(),
            });
        }

        let uniform_entries: Vec<wgpu::BindGroupLayoutEntry> = source
            .uniform_blocks
            .iter()
            .map(|block| wgpu::BindGroupLayoutEntry {
                binding: block.id as u32,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        let uniform_label = format!("{name} uniforms");
        let uniform_layout =
            device
                .device()
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&uniform_label),
                    entries: &uniform_entries,
                });

        let texture_layout = (!source.textures.is_empty()).then(|| {
            let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..source.textures.len() as u32)
                .flat_map(|slot| {
                    [
                        wgpu::BindGroupLayoutEntry {
                            binding: slot * 2,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: slot * 2 + 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ]
                })
                .collect();
            let label = format!("{name} textures");
            device
                .device()
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&label),
                    entries: &entries,
                })
        });

        let mut group_layouts = vec![&uniform_layout];
        if let Some(layout) = &texture_layout {
            group_layouts.push(layout);
        }
        let layout_label = format!("{name} layout");
        let pipeline_layout =
            device
                .device()
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(&layout_label),
                    bind_group_layouts: &group_layouts,
                    immediate_size: 0,
                });

        log::debug!(
            "Compiled program '{}' ({} attributes, {} promoted)",
            name,
            attributes.len(),
            promoted.len()
        );

        Ok(Self {
            name: name.to_string(),
            device,
            module,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            attributes,
            uniform_blocks: source.uniform_blocks.clone(),
            texture_count: source.textures.len(),
            pipelines: Mutex::new(HashMap::new()),
        })
    }

    /// Number of texture slots the program samples.
    pub fn texture_count(&self) -> usize {
        self.texture_count
    }

    /// Returns the pipeline for `key`, building it on first use.
    pub fn pipeline(&self, key: &PipelineKey) -> wgpu::RenderPipeline {
        let mut pipelines = self.pipelines.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pipeline) = pipelines.get(key) {
            return pipeline.clone();
        }
        let pipeline = self.build_pipeline(key);
        pipelines.insert(key.clone(), pipeline.clone());
        pipeline
    }

    /// Number of cached pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drops every cached pipeline. They are rebuilt on the next draw.
    pub fn clear_pipelines(&self) {
        self.pipelines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Binds the uniform blocks the program declares.
    ///
    /// Returns `None` if any declared block is missing from `buffers`.
    pub fn uniform_bind_group(
        &self,
        buffers: &[(UniformBlockId, &wgpu::Buffer)],
    ) -> Option<wgpu::BindGroup> {
        let mut entries = Vec::with_capacity(self.uniform_blocks.len());
        for block in &self.uniform_blocks {
            let (_, buffer) = buffers.iter().find(|(id, _)| *id == block.id)?;
            entries.push(wgpu::BindGroupEntry {
                binding: block.id as u32,
                resource: buffer.as_entire_binding(),
            });
        }
        Some(
            self.device
                .device()
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&self.name),
                    layout: &self.uniform_layout,
                    entries: &entries,
                }),
        )
    }

    /// Binds one view and sampler per texture slot.
    ///
    /// Returns `None` when the program samples nothing or a slot is missing.
    pub fn texture_bind_group(
        &self,
        textures: &[Option<(wgpu::TextureView, wgpu::Sampler)>],
    ) -> Option<wgpu::BindGroup> {
        let layout = self.texture_layout.as_ref()?;
        let mut entries = Vec::with_capacity(self.texture_count * 2);
        for slot in 0..self.texture_count {
            let (view, sampler) = textures.get(slot)?.as_ref()?;
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 * 2,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 * 2 + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        Some(
            self.device
                .device()
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&self.name),
                    layout,
                    entries: &entries,
                }),
        )
    }

    fn build_pipeline(&self, key: &PipelineKey) -> wgpu::RenderPipeline {
        log::trace!("Building pipeline for '{}': {:?}", self.name, key);

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .buffers
            .iter()
            .map(|b| {
                [wgpu::VertexAttribute {
                    format: b.format,
                    offset: 0,
                    shader_location: b.location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout> = key
            .buffers
            .iter()
            .zip(attributes.iter())
            .map(|(b, attrs)| wgpu::VertexBufferLayout {
                array_stride: b.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let blend = key
            .translucent
            .then_some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING);

        self.device
            .device()
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&self.name),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.module,
                    entry_point: Some(VERTEX_ENTRY_POINT),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.module,
                    entry_point: Some(FRAGMENT_ENTRY_POINT),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: key.color_format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: key.depth_write,
                    depth_compare: if key.depth_test {
                        wgpu::CompareFunction::LessEqual
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
    }
}

impl ShaderProgram for WgpuShaderProgram {
    fn type_name(&self) -> &'static str {
        "wgpu"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn vertex_attributes(&self) -> &VertexAttributeArray {
        &self.attributes
    }

    fn uniform_blocks(&self) -> &[UniformBlockInfo] {
        &self.uniform_blocks
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Turns compiler errors reported for `module` into a [`ShaderError`].
fn check_compilation(name: &str, module: &wgpu::ShaderModule) -> Result<(), ShaderError> {
    let info = pollster::block_on(module.get_compilation_info());
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match &m.location {
            Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
            None => m.message.clone(),
        })
        .collect();
    if errors.is_empty() {
        return Ok(());
    }
    Err(ShaderError::CompilationFailed {
        shader: name.to_string(),
        details: errors.join("\n"),
    })
}
