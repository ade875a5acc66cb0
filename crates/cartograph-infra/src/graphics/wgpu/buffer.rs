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


//! Vertex, index and uniform buffers.

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;
use cartograph_core::gfx::buffer::{BufferResource, BufferUsage};
use cartograph_core::gfx::error::ResourceError;
use cartograph_core::gfx::uniform_buffer::UniformBuffer;
use std::any::Any;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// A vertex or index buffer created by an upload pass.
#[derive(Debug)]
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
    size: usize,
    usage: BufferUsage,
    device: Arc<WgpuDevice>,
}

impl WgpuBuffer {
    /// Creates a buffer initialized with `data`.
    pub fn new(device: Arc<WgpuDevice>, label: &str, data: &[u8], usage: BufferUsage) -> Self {
        let buffer = create_padded_buffer(&device, label, data, usage.into_wgpu());
        device.stats().buffer_created(data.len() as u64);
        Self {
            buffer,
            size: data.len(),
            usage,
            device,
        }
    }

    /// The native buffer.
    pub fn wgpu_buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Records a copy of `data` into this buffer on `encoder`, through a
    /// staging buffer. `data` must match the buffer size.
    pub fn record_write(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        if data.len() != self.size {
            return Err(ResourceError::SizeMismatch {
                expected: self.size,
                actual: data.len(),
            });
        }
        if !self.usage.contains(BufferUsage::COPY_DST) {
            return Err(ResourceError::BackendError(
                "buffer was not created with COPY_DST".to_string(),
            ));
        }
        let contents = padded(data);
        let staging = create_padded_buffer(
            &self.device,
            "staging",
            &contents,
            wgpu::BufferUsages::COPY_SRC,
        );
        encoder.copy_buffer_to_buffer(&staging, 0, &self.buffer, 0, contents.len() as u64);
        Ok(())
    }
}

impl BufferResource for WgpuBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for WgpuBuffer {
    fn drop(&mut self) {
        self.device.stats().buffer_released(self.size as u64);
    }
}

/// A fixed-size uniform block.
#[derive(Debug)]
pub struct WgpuUniformBuffer {
    buffer: wgpu::Buffer,
    size: usize,
    device: Arc<WgpuDevice>,
}

impl WgpuUniformBuffer {
    /// Creates a uniform buffer holding `data`.
    pub fn new(device: Arc<WgpuDevice>, data: &[u8], persistent: bool) -> Result<Self, ResourceError> {
        if data.is_empty() {
            return Err(ResourceError::InvalidSize {
                width: 0,
                height: 0,
            });
        }
        let label = if persistent {
            "persistent uniform buffer"
        } else {
            "uniform buffer"
        };
        let buffer = create_padded_buffer(
            &device,
            label,
            data,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        device.stats().buffer_created(data.len() as u64);
        Ok(Self {
            buffer,
            size: data.len(),
            device,
        })
    }

    /// The native buffer.
    pub fn wgpu_buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl UniformBuffer for WgpuUniformBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn update(&self, data: &[u8]) -> Result<(), ResourceError> {
        if data.len() != self.size {
            return Err(ResourceError::SizeMismatch {
                expected: self.size,
                actual: data.len(),
            });
        }
        write_padded(&self.device, &self.buffer, data);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for WgpuUniformBuffer {
    fn drop(&mut self) {
        self.device.stats().buffer_released(self.size as u64);
    }
}

/// wgpu requires buffer sizes and writes to be multiples of
/// [`wgpu::COPY_BUFFER_ALIGNMENT`].
fn padded(data: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let len = data.len().max(1).div_ceil(align) * align;
    if len == data.len() {
        std::borrow::Cow::Borrowed(data)
    } else {
        let mut owned = data.to_vec();
        owned.resize(len, 0);
        std::borrow::Cow::Owned(owned)
    }
}

fn create_padded_buffer(
    device: &WgpuDevice,
    label: &str,
    data: &[u8],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &padded(data),
            usage,
        })
}

fn write_padded(device: &WgpuDevice, buffer: &wgpu::Buffer, data: &[u8]) {
    device.queue.write_buffer(buffer, 0, &padded(data));
}
