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

//! CPU-side pixel buffers.

use super::types::{Size, TexturePixelType};

/// A tightly packed image with one byte per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    size: Size,
    pixel_type: TexturePixelType,
    data: Vec<u8>,
}

impl Image {
    /// Creates a zero-filled image.
    pub fn new(size: Size, pixel_type: TexturePixelType) -> Self {
        Self {
            size,
            pixel_type,
            data: vec![0; size.area() * pixel_type.channels()],
        }
    }

    /// Wraps existing pixel data. Returns `None` if the length does not match the size.
    pub fn from_data(size: Size, pixel_type: TexturePixelType, data: Vec<u8>) -> Option<Self> {
        (data.len() == size.area() * pixel_type.channels()).then_some(Self {
            size,
            pixel_type,
            data,
        })
    }

    /// Image size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Channel layout.
    pub fn pixel_type(&self) -> TexturePixelType {
        self.pixel_type
    }

    /// Raw pixel bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.size.width as usize * self.pixel_type.channels()
    }

    /// Returns a copy of `pixels` (of `size`) centred inside a transparent border of
    /// `padding` pixels on every side.
    pub fn padded(
        pixels: &[u8],
        size: Size,
        pixel_type: TexturePixelType,
        padding: u32,
    ) -> Option<Self> {
        let channels = pixel_type.channels();
        if pixels.len() != size.area() * channels {
            return None;
        }
        let padded_size = Size::new(size.width + 2 * padding, size.height + 2 * padding);
        let mut out = Self::new(padded_size, pixel_type);
        let src_stride = size.width as usize * channels;
        let dst_stride = out.stride();
        for row in 0..size.height as usize {
            let src = &pixels[row * src_stride..(row + 1) * src_stride];
            let dst_start = (row + padding as usize) * dst_stride + padding as usize * channels;
            out.data[dst_start..dst_start + src_stride].copy_from_slice(src);
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_checks_length() {
        assert!(Image::from_data(Size::new(2, 2), TexturePixelType::Alpha, vec![0; 4]).is_some());
        assert!(Image::from_data(Size::new(2, 2), TexturePixelType::Rgba, vec![0; 4]).is_none());
    }

    #[test]
    fn test_padded_copies_into_center() {
        let image = Image::padded(&[7, 8, 9, 10], Size::new(2, 2), TexturePixelType::Alpha, 1)
            .expect("length matches");
        assert_eq!(image.size(), Size::new(4, 4));
        #[rustfmt::skip]
        let expected = vec![
            0, 0, 0, 0,
            0, 7, 8, 0,
            0, 9, 10, 0,
            0, 0, 0, 0,
        ];
        assert_eq!(image.data(), expected.as_slice());
    }
}
