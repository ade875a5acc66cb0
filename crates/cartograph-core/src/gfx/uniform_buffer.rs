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

//! Uniform buffers and the id-keyed arrays that bind them to shader blocks.
//!
//! A [`UniformBufferArray`] maps a small integer block id to a shared buffer.
//! It is not synchronized: arrays live on drawables and layer groups, which are
//! only mutated from the render thread once uploaded.

use super::context::Context;
use super::error::ResourceError;
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identifier of a uniform block within a shader, also its binding slot.
pub type UniformBlockId = usize;

/// A fixed-size block of GPU-visible bytes.
///
/// The size never changes after creation; only the contents are replaced.
pub trait UniformBuffer: Send + Sync + Debug {
    /// Size of the buffer in bytes.
    fn size(&self) -> usize;

    /// Replaces the whole contents. `data.len()` must equal [`size`](UniformBuffer::size).
    fn update(&self, data: &[u8]) -> Result<(), ResourceError>;

    /// Allows the owning backend to recover its concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Hashes uniform contents so unchanged data can skip the upload.
pub fn content_hash(data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
struct UniformSlot {
    buffer: Arc<dyn UniformBuffer>,
    /// Hash of the last contents written through this array; `None` when the
    /// buffer was attached from elsewhere and its contents are unknown here.
    content_hash: Option<u64>,
}

/// A collection of uniform buffers indexed by [`UniformBlockId`].
#[derive(Debug, Clone, Default)]
pub struct UniformBufferArray {
    slots: Vec<Option<UniformSlot>>,
}

impl UniformBufferArray {
    /// Creates an array with room for `count` blocks.
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    /// Number of block slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` when no buffer is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the buffer bound to `id`.
    pub fn get(&self, id: UniformBlockId) -> Option<&Arc<dyn UniformBuffer>> {
        self.slots.get(id)?.as_ref().map(|slot| &slot.buffer)
    }

    /// Binds a shared buffer to `id`, growing the array if needed. `None` clears the slot.
    pub fn set(&mut self, id: UniformBlockId, buffer: Option<Arc<dyn UniformBuffer>>) {
        if id >= self.slots.len() {
            self.slots.resize(id + 1, None);
        }
        self.slots[id] = buffer.map(|buffer| UniformSlot {
            buffer,
            content_hash: None,
        });
    }

    /// Writes `data` into the buffer at `id`, creating it through `context` when the
    /// slot is empty or holds a buffer of another size.
    ///
    /// Returns `true` if anything was uploaded; identical contents are skipped so
    /// the buffer identity stays stable across frames.
    pub fn create_or_update<C: Context + ?Sized>(
        &mut self,
        id: UniformBlockId,
        data: &[u8],
        context: &C,
    ) -> Result<bool, ResourceError> {
        if id >= self.slots.len() {
            self.slots.resize(id + 1, None);
        }
        let hash = content_hash(data);
        if let Some(slot) = self.slots[id].as_mut() {
            if slot.buffer.size() == data.len() {
                if slot.content_hash == Some(hash) {
                    return Ok(false);
                }
                slot.buffer.update(data)?;
                slot.content_hash = Some(hash);
                return Ok(true);
            }
        }
        let buffer = context.create_uniform_buffer(data, false)?;
        self.slots[id] = Some(UniformSlot {
            buffer,
            content_hash: Some(hash),
        });
        Ok(true)
    }

    /// Iterates occupied slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (UniformBlockId, &Arc<dyn UniformBuffer>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|s| (id, &s.buffer)))
    }

    /// Unbinds every buffer.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}
