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


//! Conversions from the backend-agnostic gfx types to their `wgpu` counterparts.

use cartograph_core::gfx::buffer::BufferUsage;
use cartograph_core::gfx::types::{
    AttributeDataType, BackendType, Rect, Size, TextureChannelDataType, TextureFilterType,
    TexturePixelType, TextureWrapType,
};

/// A local extension trait to convert our types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Backends ---

impl IntoWgpu<wgpu::Backends> for BackendType {
    fn into_wgpu(self) -> wgpu::Backends {
        match self {
            BackendType::OpenGl => wgpu::Backends::GL,
            BackendType::Metal => wgpu::Backends::METAL,
            BackendType::Vulkan => wgpu::Backends::VULKAN,
            BackendType::WebGpu => wgpu::Backends::BROWSER_WEBGPU,
        }
    }
}

impl IntoWgpu<wgpu::Backend> for BackendType {
    fn into_wgpu(self) -> wgpu::Backend {
        match self {
            BackendType::OpenGl => wgpu::Backend::Gl,
            BackendType::Metal => wgpu::Backend::Metal,
            BackendType::Vulkan => wgpu::Backend::Vulkan,
            BackendType::WebGpu => wgpu::Backend::BrowserWebGpu,
        }
    }
}

// --- Dimensions ---

impl IntoWgpu<wgpu::Extent3d> for Size {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl IntoWgpu<wgpu::Origin3d> for Rect {
    fn into_wgpu(self) -> wgpu::Origin3d {
        wgpu::Origin3d {
            x: self.x,
            y: self.y,
            z: 0,
        }
    }
}

// --- Textures and samplers ---

/// The storage format of a texture, or `None` for layouts wgpu cannot store.
impl IntoWgpu<Option<wgpu::TextureFormat>> for (TexturePixelType, TextureChannelDataType) {
    fn into_wgpu(self) -> Option<wgpu::TextureFormat> {
        use TextureChannelDataType as C;
        use TexturePixelType as P;
        match self {
            (P::Rgba, C::UnsignedByte) => Some(wgpu::TextureFormat::Rgba8Unorm),
            (P::Rgba, C::HalfFloat) => Some(wgpu::TextureFormat::Rgba16Float),
            (P::Rgba, C::Float) => Some(wgpu::TextureFormat::Rgba32Float),
            (P::Alpha | P::Luminance, C::UnsignedByte) => Some(wgpu::TextureFormat::R8Unorm),
            (P::Alpha | P::Luminance, C::HalfFloat) => Some(wgpu::TextureFormat::R16Float),
            (P::Alpha | P::Luminance, C::Float) => Some(wgpu::TextureFormat::R32Float),
            (P::Depth, C::Float) => Some(wgpu::TextureFormat::Depth32Float),
            (P::Depth, _) => Some(wgpu::TextureFormat::Depth24Plus),
            (P::Stencil, C::UnsignedByte) => Some(wgpu::TextureFormat::Stencil8),
            (P::Stencil, _) => None,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for TextureFilterType {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            TextureFilterType::Nearest => wgpu::FilterMode::Nearest,
            TextureFilterType::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::AddressMode> for TextureWrapType {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            TextureWrapType::Clamp => wgpu::AddressMode::ClampToEdge,
            TextureWrapType::Repeat => wgpu::AddressMode::Repeat,
        }
    }
}

// --- Vertex data ---

impl IntoWgpu<wgpu::VertexFormat> for AttributeDataType {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        use AttributeDataType as A;
        match self {
            A::Byte => wgpu::VertexFormat::Sint8,
            A::Byte2 => wgpu::VertexFormat::Sint8x2,
            A::Byte4 => wgpu::VertexFormat::Sint8x4,
            A::UByte => wgpu::VertexFormat::Uint8,
            A::UByte2 => wgpu::VertexFormat::Uint8x2,
            A::UByte4 => wgpu::VertexFormat::Uint8x4,
            A::Short => wgpu::VertexFormat::Sint16,
            A::Short2 => wgpu::VertexFormat::Sint16x2,
            A::Short4 => wgpu::VertexFormat::Sint16x4,
            A::UShort => wgpu::VertexFormat::Uint16,
            A::UShort2 => wgpu::VertexFormat::Uint16x2,
            A::UShort4 => wgpu::VertexFormat::Uint16x4,
            A::Int => wgpu::VertexFormat::Sint32,
            A::Int2 => wgpu::VertexFormat::Sint32x2,
            A::Int3 => wgpu::VertexFormat::Sint32x3,
            A::Int4 => wgpu::VertexFormat::Sint32x4,
            A::UInt => wgpu::VertexFormat::Uint32,
            A::Float => wgpu::VertexFormat::Float32,
            A::Float2 => wgpu::VertexFormat::Float32x2,
            A::Float3 => wgpu::VertexFormat::Float32x3,
            A::Float4 => wgpu::VertexFormat::Float32x4,
        }
    }
}

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let mut usages = wgpu::BufferUsages::empty();
        if self.contains(BufferUsage::COPY_DST) {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        if self.contains(BufferUsage::VERTEX) {
            usages |= wgpu::BufferUsages::VERTEX;
        }
        if self.contains(BufferUsage::INDEX) {
            usages |= wgpu::BufferUsages::INDEX;
        }
        if self.contains(BufferUsage::UNIFORM) {
            usages |= wgpu::BufferUsages::UNIFORM;
        }
        usages
    }
}

/// Converts a wgpu backend back to ours. DirectX 12 and the no-op backend have
/// no counterpart.
pub fn backend_type_from_wgpu(backend: wgpu::Backend) -> Option<BackendType> {
    match backend {
        wgpu::Backend::Vulkan => Some(BackendType::Vulkan),
        wgpu::Backend::Metal => Some(BackendType::Metal),
        wgpu::Backend::Gl => Some(BackendType::OpenGl),
        wgpu::Backend::BrowserWebGpu => Some(BackendType::WebGpu),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_format_conversion() {
        let rgba: Option<wgpu::TextureFormat> =
            (TexturePixelType::Rgba, TextureChannelDataType::UnsignedByte).into_wgpu();
        assert_eq!(rgba, Some(wgpu::TextureFormat::Rgba8Unorm));

        let alpha: Option<wgpu::TextureFormat> =
            (TexturePixelType::Alpha, TextureChannelDataType::UnsignedByte).into_wgpu();
        assert_eq!(alpha, Some(wgpu::TextureFormat::R8Unorm));

        let stencil: Option<wgpu::TextureFormat> =
            (TexturePixelType::Stencil, TextureChannelDataType::Float).into_wgpu();
        assert_eq!(stencil, None);
    }

    #[test]
    fn test_vertex_format_sizes_match() {
        for data_type in [
            AttributeDataType::Short2,
            AttributeDataType::UByte4,
            AttributeDataType::Int3,
            AttributeDataType::Float4,
        ] {
            let format: wgpu::VertexFormat = data_type.into_wgpu();
            assert_eq!(format.size() as usize, data_type.size());
        }
    }

    #[test]
    fn test_buffer_usage_conversion() {
        let usage: wgpu::BufferUsages = (BufferUsage::VERTEX | BufferUsage::COPY_DST).into_wgpu();
        assert_eq!(
            usage,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST
        );
        let none: wgpu::BufferUsages = BufferUsage::default().into_wgpu();
        assert!(none.is_empty());
    }

    #[test]
    fn test_backend_round_trip() {
        for backend in [
            BackendType::OpenGl,
            BackendType::Metal,
            BackendType::Vulkan,
            BackendType::WebGpu,
        ] {
            let wgpu_backend: wgpu::Backend = backend.into_wgpu();
            assert_eq!(backend_type_from_wgpu(wgpu_backend), Some(backend));
        }
        assert_eq!(backend_type_from_wgpu(wgpu::Backend::Dx12), None);
    }

    #[test]
    fn test_sampler_conversion() {
        assert_eq!(
            wgpu::FilterMode::Linear,
            TextureFilterType::Linear.into_wgpu()
        );
        assert_eq!(
            wgpu::AddressMode::Repeat,
            TextureWrapType::Repeat.into_wgpu()
        );
    }
}
