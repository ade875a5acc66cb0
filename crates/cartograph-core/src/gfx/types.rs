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

//! Small value types shared by every graphics resource.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The graphics API a backend drives. Exactly one is selected per renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// OpenGL / OpenGL ES.
    #[serde(alias = "gl")]
    OpenGl,
    /// Apple Metal.
    Metal,
    /// Vulkan.
    Vulkan,
    /// WebGPU (browser or native implementation).
    WebGpu,
}

impl Default for BackendType {
    fn default() -> Self {
        #[cfg(target_os = "macos")]
        {
            BackendType::Metal
        }
        #[cfg(target_arch = "wasm32")]
        {
            BackendType::WebGpu
        }
        #[cfg(not(any(target_os = "macos", target_arch = "wasm32")))]
        {
            BackendType::Vulkan
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendType::OpenGl => "OpenGL",
            BackendType::Metal => "Metal",
            BackendType::Vulkan => "Vulkan",
            BackendType::WebGpu => "WebGPU",
        };
        f.write_str(name)
    }
}

/// Whether the renderer may assume it is the only user of the GPU state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    /// The renderer owns all global GPU state; cached state is trusted between frames.
    #[default]
    Unique,
    /// The host application also issues GPU commands; cached state is invalidated
    /// every time the backend is activated.
    Shared,
}

/// A set of render passes a drawable participates in.
///
/// A single pass is a set with exactly one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderPasses {
    bits: u8,
}

impl RenderPasses {
    /// No pass; the drawable is never rendered.
    pub const NONE: Self = Self { bits: 0 };
    /// Opaque geometry, drawn first with depth writes.
    pub const OPAQUE: Self = Self { bits: 1 << 0 };
    /// Blended geometry, drawn after every opaque drawable.
    pub const TRANSLUCENT: Self = Self { bits: 1 << 1 };
    /// Extruded geometry rendered into an offscreen target.
    pub const PASS_3D: Self = Self { bits: 1 << 2 };

    /// Creates a set from raw bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// Combines two sets.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Returns `true` if any pass of `other` is in this set.
    pub const fn intersects(&self, other: Self) -> bool {
        (self.bits & other.bits) != 0
    }

    /// Returns `true` if every pass of `other` is in this set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Returns `true` if the set is empty.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for RenderPasses {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for RenderPasses {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Whether a drawable writes to the depth buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthMaskType {
    /// Depth is tested but not written.
    #[default]
    ReadOnly,
    /// Depth is tested and written.
    ReadWrite,
}

/// Channel layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexturePixelType {
    /// Single-channel coverage (glyphs, SDF icons).
    Alpha,
    /// Four channel color.
    #[default]
    Rgba,
    /// Single-channel luminance.
    Luminance,
    /// Depth attachment.
    Depth,
    /// Stencil attachment.
    Stencil,
}

impl TexturePixelType {
    /// Number of channels stored per pixel.
    pub const fn channels(&self) -> usize {
        match self {
            TexturePixelType::Rgba => 4,
            _ => 1,
        }
    }
}

/// Storage type of each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureChannelDataType {
    /// 8-bit normalized.
    #[default]
    UnsignedByte,
    /// 16-bit float.
    HalfFloat,
    /// 32-bit float.
    Float,
}

impl TextureChannelDataType {
    /// Bytes per channel.
    pub const fn bytes(&self) -> usize {
        match self {
            TextureChannelDataType::UnsignedByte => 1,
            TextureChannelDataType::HalfFloat => 2,
            TextureChannelDataType::Float => 4,
        }
    }
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilterType {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Bilinear interpolation.
    Linear,
}

/// Addressing outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrapType {
    /// Clamp to the edge texel.
    #[default]
    Clamp,
    /// Tile the texture.
    Repeat,
}

/// Sampler configuration of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerState {
    /// Minification and magnification filter.
    pub filter: TextureFilterType,
    /// Horizontal wrapping.
    pub wrap_u: TextureWrapType,
    /// Vertical wrapping.
    pub wrap_v: TextureWrapType,
}

/// Component layout of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AttributeDataType {
    Byte,
    Byte2,
    Byte4,
    UByte,
    UByte2,
    UByte4,
    Short,
    Short2,
    Short4,
    UShort,
    UShort2,
    UShort4,
    Int,
    Int2,
    Int3,
    Int4,
    UInt,
    Float,
    Float2,
    Float3,
    Float4,
}

impl AttributeDataType {
    /// Number of components.
    pub const fn components(&self) -> usize {
        use AttributeDataType::*;
        match self {
            Byte | UByte | Short | UShort | Int | UInt | Float => 1,
            Byte2 | UByte2 | Short2 | UShort2 | Int2 | Float2 => 2,
            Int3 | Float3 => 3,
            Byte4 | UByte4 | Short4 | UShort4 | Int4 | Float4 => 4,
        }
    }

    /// Size in bytes of one element.
    pub const fn size(&self) -> usize {
        use AttributeDataType::*;
        let component = match self {
            Byte | Byte2 | Byte4 | UByte | UByte2 | UByte4 => 1,
            Short | Short2 | Short4 | UShort | UShort2 | UShort4 => 2,
            Int | Int2 | Int3 | Int4 | UInt | Float | Float2 | Float3 | Float4 => 4,
        };
        component * self.components()
    }
}

/// A two-dimensional size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl Rect {
    /// Creates a rectangle.
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Returns the rectangle's size.
    pub const fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Returns `true` if this rectangle lies entirely inside a surface of `size`.
    pub const fn fits_in(&self, size: Size) -> bool {
        self.x as u64 + self.w as u64 <= size.width as u64
            && self.y as u64 + self.h as u64 <= size.height as u64
    }

    /// Returns `true` if the two rectangles share any pixel.
    pub const fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_pass_set_operations() {
        let both = RenderPasses::OPAQUE | RenderPasses::TRANSLUCENT;
        assert!(both.contains(RenderPasses::OPAQUE));
        assert!(both.intersects(RenderPasses::TRANSLUCENT));
        assert!(!both.contains(RenderPasses::PASS_3D));
        assert!(RenderPasses::NONE.is_empty());
    }

    #[test]
    fn test_attribute_sizes() {
        assert_eq!(AttributeDataType::Short2.size(), 4);
        assert_eq!(AttributeDataType::Float4.size(), 16);
        assert_eq!(AttributeDataType::UByte4.components(), 4);
    }

    #[test]
    fn test_backend_type_serde_names() {
        let parsed: BackendType = serde_json::from_str("\"webgpu\"").unwrap();
        assert_eq!(parsed, BackendType::WebGpu);
        let parsed: BackendType = serde_json::from_str("\"gl\"").unwrap();
        assert_eq!(parsed, BackendType::OpenGl);
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.overlaps(&Rect::new(5, 5, 10, 10)));
        assert!(!a.overlaps(&Rect::new(10, 0, 10, 10)));
        assert!(a.fits_in(Size::new(10, 10)));
    }
}
