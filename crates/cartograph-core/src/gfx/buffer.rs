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

//! Defines data structures related to GPU buffer resources.

use std::any::Any;
use std::fmt::Debug;

/// A set of flags describing the allowed usages of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferUsage {
    bits: u32,
}

impl BufferUsage {
    /// The buffer can be the destination of a copy (i.e. updated after creation).
    pub const COPY_DST: Self = Self { bits: 1 << 0 };
    /// The buffer can be bound as a vertex buffer.
    pub const VERTEX: Self = Self { bits: 1 << 1 };
    /// The buffer can be bound as an index buffer.
    pub const INDEX: Self = Self { bits: 1 << 2 };
    /// The buffer can be bound as a uniform buffer.
    pub const UNIFORM: Self = Self { bits: 1 << 3 };

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns `true` if every flag in `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

/// A backend buffer created through an upload pass.
///
/// The size is fixed at creation; contents may only be replaced through
/// [`UploadPass::update_buffer`](crate::gfx::command::UploadPass::update_buffer).
pub trait BufferResource: Send + Sync + Debug {
    /// Size of the buffer in bytes.
    fn size(&self) -> usize;

    /// Usage flags the buffer was created with.
    fn usage(&self) -> BufferUsage;

    /// Allows the owning backend to recover its concrete type.
    fn as_any(&self) -> &dyn Any;
}
