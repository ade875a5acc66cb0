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

//! Vertex attributes: the source of one shader input.
//!
//! A shader program carries a *default* [`VertexAttributeArray`] describing every
//! input it declares. A drawable may carry an *override* array; at bind time
//! [`VertexAttributeArray::resolve`] picks the override when present and the
//! default otherwise.

use super::types::AttributeDataType;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One element of an attribute, either per-vertex or a constant.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum ElementType {
    Int(i32),
    Int2([i32; 2]),
    Int3([i32; 3]),
    Int4([i32; 4]),
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
}

impl ElementType {
    fn write_le(&self, out: &mut Vec<u8>) {
        match self {
            ElementType::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            ElementType::Int2(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
            ElementType::Int3(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
            ElementType::Int4(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
            ElementType::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            ElementType::Float2(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
            ElementType::Float3(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
            ElementType::Float4(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
        }
    }
}

/// Raw vertex bytes shared between several attributes (interleaved layouts).
#[derive(Debug, Clone)]
pub struct SharedVertexData {
    /// The interleaved bytes.
    pub bytes: Arc<Vec<u8>>,
    /// Byte offset of this attribute inside each vertex.
    pub offset: usize,
    /// Number of vertices in `bytes`.
    pub vertex_count: usize,
}

/// Describes the source of a single shader input.
#[derive(Debug, Clone)]
pub struct VertexAttribute {
    index: u32,
    data_type: AttributeDataType,
    stride: usize,
    items: Vec<ElementType>,
    shared: Option<SharedVertexData>,
    dirty: bool,
}

impl VertexAttribute {
    /// Creates an attribute at shader location `index` with `count` zeroed items.
    pub fn new(index: u32, data_type: AttributeDataType, count: usize) -> Self {
        Self {
            index,
            data_type,
            stride: data_type.size(),
            items: vec![ElementType::Float(0.0); count],
            shared: None,
            dirty: true,
        }
    }

    /// Shader location.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Component layout.
    pub fn data_type(&self) -> AttributeDataType {
        self.data_type
    }

    /// Bytes between consecutive vertices.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Sets the stride for interleaved data.
    pub fn set_stride(&mut self, stride: usize) {
        if self.stride != stride {
            self.stride = stride;
            self.dirty = true;
        }
    }

    /// Number of vertices this attribute provides. One item acts as a constant.
    pub fn count(&self) -> usize {
        match &self.shared {
            Some(shared) => shared.vertex_count,
            None => self.items.len(),
        }
    }

    /// Returns the item at `i`.
    pub fn get(&self, i: usize) -> Option<&ElementType> {
        self.items.get(i)
    }

    /// Sets the item at `i`, growing the attribute when needed.
    ///
    /// The attribute is only marked dirty when the stored value actually changes.
    pub fn set(&mut self, i: usize, value: ElementType) {
        if i >= self.items.len() {
            self.items.resize(i + 1, ElementType::Float(0.0));
            self.dirty = true;
        }
        if self.items[i] != value {
            self.items[i] = value;
            self.dirty = true;
        }
    }

    /// Replaces all items.
    pub fn set_items(&mut self, items: Vec<ElementType>) {
        if self.items != items {
            self.items = items;
            self.dirty = true;
        }
    }

    /// Points this attribute at externally owned interleaved bytes.
    pub fn set_shared_raw_data(&mut self, shared: SharedVertexData, stride: usize) {
        self.shared = Some(shared);
        self.stride = stride;
        self.dirty = true;
    }

    /// Returns the shared raw data, if any.
    pub fn shared_raw_data(&self) -> Option<&SharedVertexData> {
        self.shared.as_ref()
    }

    /// Encodes the items as tightly packed little-endian bytes.
    pub fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.items.len() * self.data_type.size());
        for item in &self.items {
            item.write_le(&mut out);
        }
        out
    }

    /// Returns `true` if the attribute changed since the last upload.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the attribute as uploaded.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// A name-keyed set of attributes.
#[derive(Debug, Clone, Default)]
pub struct VertexAttributeArray {
    attrs: BTreeMap<String, VertexAttribute>,
}

impl VertexAttributeArray {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new attribute. Returns `None` if `name` is already present.
    pub fn add(
        &mut self,
        name: &str,
        index: u32,
        data_type: AttributeDataType,
        count: usize,
    ) -> Option<&mut VertexAttribute> {
        if self.attrs.contains_key(name) {
            return None;
        }
        Some(
            self.attrs
                .entry(name.to_string())
                .or_insert_with(|| VertexAttribute::new(index, data_type, count)),
        )
    }

    /// Returns the attribute `name`, adding it if missing.
    pub fn get_or_add(
        &mut self,
        name: &str,
        index: u32,
        data_type: AttributeDataType,
        count: usize,
    ) -> &mut VertexAttribute {
        self.attrs
            .entry(name.to_string())
            .or_insert_with(|| VertexAttribute::new(index, data_type, count))
    }

    /// Returns the attribute `name`.
    pub fn get(&self, name: &str) -> Option<&VertexAttribute> {
        self.attrs.get(name)
    }

    /// Returns the attribute `name` mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut VertexAttribute> {
        self.attrs.get_mut(name)
    }

    /// Removes the attribute `name`.
    pub fn remove(&mut self, name: &str) -> Option<VertexAttribute> {
        self.attrs.remove(name)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns `true` if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Removes every attribute.
    pub fn clear(&mut self) {
        self.attrs.clear();
    }

    /// Iterates attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VertexAttribute)> {
        self.attrs.iter().map(|(name, attr)| (name.as_str(), attr))
    }

    /// Returns `true` if any attribute changed since the last upload.
    pub fn is_dirty(&self) -> bool {
        self.attrs.values().any(VertexAttribute::is_dirty)
    }

    /// Marks every attribute as uploaded.
    pub fn clear_dirty(&mut self) {
        self.attrs.values_mut().for_each(VertexAttribute::clear_dirty);
    }

    /// Sum of the element sizes of all attributes, i.e. the interleaved vertex size.
    pub fn total_size(&self) -> usize {
        self.attrs.values().map(|a| a.data_type().size()).sum()
    }

    /// Largest vertex count across attributes.
    pub fn max_count(&self) -> usize {
        self.attrs.values().map(VertexAttribute::count).max().unwrap_or(0)
    }

    /// Visits every attribute of this (default) array together with the matching
    /// override from `overrides`, if one exists.
    pub fn resolve<F>(&self, overrides: Option<&VertexAttributeArray>, mut delegate: F)
    where
        F: FnMut(&str, &VertexAttribute, Option<&VertexAttribute>),
    {
        for (name, default) in &self.attrs {
            let override_attr = overrides.and_then(|o| o.get(name));
            delegate(name, default, override_attr);
        }
    }
}
