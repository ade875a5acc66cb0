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

//! Program sources and the compiled-program contract.

use crate::gfx::types::AttributeDataType;
use crate::gfx::uniform_buffer::UniformBlockId;
use crate::gfx::vertex_attribute::VertexAttributeArray;
use std::any::Any;
use std::fmt::Debug;

/// A vertex input declared by a program.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    /// Attribute name, e.g. `a_pos`.
    pub name: String,
    /// Shader location.
    pub index: u32,
    /// Component layout.
    pub data_type: AttributeDataType,
}

/// A uniform block declared by a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockInfo {
    /// Block name, e.g. `FillDrawableUBO`.
    pub name: String,
    /// Binding slot.
    pub id: UniformBlockId,
}

/// The unspecialized source of a built-in shader.
///
/// `uniform_properties` lists, in bit order, the paint properties that may be
/// promoted from a per-vertex attribute to a uniform. Its position in the list
/// is the bit used in the program cache key.
#[derive(Debug, Clone, Default)]
pub struct ProgramSource {
    /// Logical shader name.
    pub name: String,
    /// Vertex stage source.
    pub vertex: String,
    /// Fragment stage source.
    pub fragment: String,
    /// Vertex inputs, including those that may become uniforms.
    pub attributes: Vec<AttributeInfo>,
    /// Properties eligible for uniform promotion.
    pub uniform_properties: Vec<String>,
    /// Uniform blocks the program reads.
    pub uniform_blocks: Vec<UniformBlockInfo>,
    /// Sampler names, by texture slot.
    pub textures: Vec<String>,
}

impl ProgramSource {
    /// Creates a source with the two stages.
    pub fn new(
        name: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            ..Default::default()
        }
    }

    /// Declares a vertex input.
    pub fn with_attribute(mut self, name: &str, index: u32, data_type: AttributeDataType) -> Self {
        self.attributes.push(AttributeInfo {
            name: name.to_string(),
            index,
            data_type,
        });
        self
    }

    /// Declares a property that can be promoted to a uniform.
    pub fn with_uniform_property(mut self, name: &str) -> Self {
        self.uniform_properties.push(name.to_string());
        self
    }

    /// Declares a uniform block.
    pub fn with_uniform_block(mut self, name: &str, id: UniformBlockId) -> Self {
        self.uniform_blocks.push(UniformBlockInfo {
            name: name.to_string(),
            id,
        });
        self
    }

    /// Declares a sampled texture.
    pub fn with_texture(mut self, name: &str) -> Self {
        self.textures.push(name.to_string());
        self
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// A compiled, specialized backend program.
pub trait ShaderProgram: Send + Sync + Debug {
    /// Backend-specific type tag, e.g. `"wgpu"`.
    fn type_name(&self) -> &'static str;

    /// Specialized program name, `<shader>#<hash>`.
    fn name(&self) -> &str;

    /// Default vertex attributes. Drawables override entries by name.
    fn vertex_attributes(&self) -> &VertexAttributeArray;

    /// Uniform blocks the program reads.
    fn uniform_blocks(&self) -> &[UniformBlockInfo];

    /// Allows the owning backend to recover its concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Builds the default attribute array of a specialized program: every declared
/// input whose property was not promoted to a uniform, each holding one item.
pub fn default_vertex_attributes(
    source: &ProgramSource,
    promoted: impl Fn(&str) -> bool,
) -> VertexAttributeArray {
    let mut attrs = VertexAttributeArray::new();
    for info in &source.attributes {
        let property = info.name.strip_prefix("a_").unwrap_or(&info.name);
        if promoted(property) {
            continue;
        }
        attrs.add(&info.name, info.index, info.data_type, 1);
    }
    attrs
}
