// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owned pixel buffers in the formats the accumulator understands.

use half::f16;

use crate::Error;
use crate::geom::Size;

/// A linear RGBA pixel, the accumulator's working representation.
pub type LinearPixel = [f32; 4];

/// The storage format of a pixel buffer.
///
/// All formats have four interleaved channels in RGBA order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit unsigned normalized channels.
    Rgba8,
    /// 16-bit half-float channels.
    Rgba16F,
    /// 32-bit float channels.
    Rgba32F,
}

impl PixelFormat {
    /// The number of channels stored per pixel.
    pub const CHANNELS: usize = 4;

    /// The size of a single channel in bytes.
    pub const fn bytes_per_channel(self) -> usize {
        match self {
            Self::Rgba8 => 1,
            Self::Rgba16F => 2,
            Self::Rgba32F => 4,
        }
    }

    /// The size of a single channel in bits.
    pub const fn bit_depth(self) -> usize {
        self.bytes_per_channel() * 8
    }

    /// The size of a whole pixel in bytes.
    pub const fn bytes_per_pixel(self) -> usize {
        self.bytes_per_channel() * Self::CHANNELS
    }
}

/// Typed pixel storage, row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    /// 8-bit unsigned normalized pixels.
    Rgba8(Vec<[u8; 4]>),
    /// Half-float pixels.
    Rgba16F(Vec<[f16; 4]>),
    /// Full float pixels.
    Rgba32F(Vec<[f32; 4]>),
}

impl PixelBuffer {
    /// The format of the stored pixels.
    pub fn format(&self) -> PixelFormat {
        match self {
            Self::Rgba8(_) => PixelFormat::Rgba8,
            Self::Rgba16F(_) => PixelFormat::Rgba16F,
            Self::Rgba32F(_) => PixelFormat::Rgba32F,
        }
    }

    /// The number of stored pixels.
    pub fn len(&self) -> usize {
        match self {
            Self::Rgba8(p) => p.len(),
            Self::Rgba16F(p) => p.len(),
            Self::Rgba32F(p) => p.len(),
        }
    }

    /// Whether the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A rectangular image with a declared size and typed pixel storage.
///
/// The declared size and the stored pixels are not required to agree; producers hand over
/// whatever they read back and [`is_well_formed`](Self::is_well_formed) decides whether the
/// data can be trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelData {
    size: Size,
    buffer: PixelBuffer,
}

impl PixelData {
    /// Wrap an existing buffer with its declared size.
    pub fn new(size: Size, buffer: PixelBuffer) -> Self {
        Self { size, buffer }
    }

    /// Create a buffer of the given size, filled with transparent black.
    pub fn zeroed(size: Size, format: PixelFormat) -> Self {
        let len = size.area();
        let buffer = match format {
            PixelFormat::Rgba8 => PixelBuffer::Rgba8(vec![[0; 4]; len]),
            PixelFormat::Rgba16F => PixelBuffer::Rgba16F(vec![[f16::ZERO; 4]; len]),
            PixelFormat::Rgba32F => PixelBuffer::Rgba32F(vec![[0.0; 4]; len]),
        };
        Self { size, buffer }
    }

    /// Create a buffer from raw, tightly packed bytes in native endianness.
    ///
    /// The byte slice need not be aligned. Only whole pixels are accepted, but the pixel
    /// count is *not* checked against `size`; that is deferred to [`is_well_formed`].
    ///
    /// [`is_well_formed`]: Self::is_well_formed
    pub fn from_bytes(
        size: Size,
        format: PixelFormat,
        bytes: &[u8],
    ) -> Result<Self, Error> {
        let bytes_per_pixel = format.bytes_per_pixel();
        if bytes.len() % bytes_per_pixel != 0 {
            return Err(Error::PartialPixel {
                len: bytes.len(),
                bytes_per_pixel,
            });
        }
        let buffer = match format {
            PixelFormat::Rgba8 => PixelBuffer::Rgba8(bytemuck::pod_collect_to_vec(bytes)),
            PixelFormat::Rgba16F => PixelBuffer::Rgba16F(bytemuck::pod_collect_to_vec(bytes)),
            PixelFormat::Rgba32F => PixelBuffer::Rgba32F(bytemuck::pod_collect_to_vec(bytes)),
        };
        Ok(Self { size, buffer })
    }

    /// Convert linear float pixels into a buffer of the given format.
    ///
    /// 8-bit output is clamped to `[0, 1]` and rounded to the nearest step.
    pub fn from_linear(size: Size, format: PixelFormat, pixels: &[LinearPixel]) -> Self {
        let buffer = match format {
            PixelFormat::Rgba8 => {
                PixelBuffer::Rgba8(pixels.iter().map(|p| p.map(f32_to_unorm8)).collect())
            }
            PixelFormat::Rgba16F => {
                PixelBuffer::Rgba16F(pixels.iter().map(|p| p.map(f16::from_f32)).collect())
            }
            PixelFormat::Rgba32F => PixelBuffer::Rgba32F(pixels.to_vec()),
        };
        Self { size, buffer }
    }

    /// The declared size of the image.
    pub fn size(&self) -> Size {
        self.size
    }

    /// The declared width of the image.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// The declared height of the image.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// The storage format.
    pub fn format(&self) -> PixelFormat {
        self.buffer.format()
    }

    /// The typed pixel storage.
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Consume the image, returning its storage.
    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    /// The pixel storage as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.buffer {
            PixelBuffer::Rgba8(p) => bytemuck::cast_slice(p),
            PixelBuffer::Rgba16F(p) => bytemuck::cast_slice(p),
            PixelBuffer::Rgba32F(p) => bytemuck::cast_slice(p),
        }
    }

    /// The number of bytes actually stored.
    pub fn raw_size_in_bytes(&self) -> u64 {
        self.buffer.len() as u64 * self.format().bytes_per_pixel() as u64
    }

    /// The number of bytes the declared size and format call for.
    pub fn expected_size_in_bytes(&self) -> u64 {
        u64::from(self.size.width)
            * u64::from(self.size.height)
            * PixelFormat::CHANNELS as u64
            * self.format().bytes_per_channel() as u64
    }

    /// Whether the stored data matches the declared geometry exactly.
    pub fn is_well_formed(&self) -> bool {
        self.raw_size_in_bytes() == self.expected_size_in_bytes()
    }

    /// Convert every pixel to linear `f32` RGBA.
    pub fn to_linear(&self) -> Vec<LinearPixel> {
        match &self.buffer {
            PixelBuffer::Rgba8(p) => p.iter().map(|c| c.map(unorm8_to_f32)).collect(),
            PixelBuffer::Rgba16F(p) => p.iter().map(|c| c.map(f16::to_f32)).collect(),
            PixelBuffer::Rgba32F(p) => p.clone(),
        }
    }
}

/// Map an 8-bit channel to `[0, 1]`.
#[inline]
pub fn unorm8_to_f32(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Map a float channel to 8 bits, clamping to `[0, 1]` and rounding to nearest.
#[inline]
pub fn f32_to_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_requires_exact_size() {
        let size = Size::new(3, 2);
        let good = PixelData::zeroed(size, PixelFormat::Rgba16F);
        assert!(good.is_well_formed());
        assert_eq!(good.raw_size_in_bytes(), 3 * 2 * 4 * 2);

        let short = PixelData::new(size, PixelBuffer::Rgba32F(vec![[0.0; 4]; 5]));
        assert!(!short.is_well_formed());
        assert_eq!(short.expected_size_in_bytes(), 96);
        assert_eq!(short.raw_size_in_bytes(), 80);
    }

    #[test]
    fn from_bytes_rejects_partial_pixels() {
        let err = PixelData::from_bytes(Size::new(1, 1), PixelFormat::Rgba32F, &[0; 15]);
        assert_eq!(
            err,
            Err(Error::PartialPixel {
                len: 15,
                bytes_per_pixel: 16
            })
        );
    }

    #[test]
    fn from_bytes_reads_unaligned_floats() {
        let values = [0.25_f32, 0.5, 1.0, 2.0];
        let mut bytes = vec![0_u8];
        bytes.extend_from_slice(bytemuck::cast_slice(&values));

        let data =
            PixelData::from_bytes(Size::new(1, 1), PixelFormat::Rgba32F, &bytes[1..]).unwrap();
        assert_eq!(data.to_linear(), vec![values]);
        assert_eq!(data.as_bytes(), &bytes[1..]);
    }

    #[test]
    fn unorm8_conversion_is_exact_on_steps() {
        for v in 0..=255_u8 {
            assert_eq!(f32_to_unorm8(unorm8_to_f32(v)), v);
        }
        assert_eq!(f32_to_unorm8(-1.0), 0);
        assert_eq!(f32_to_unorm8(7.5), 255);
    }

    #[test]
    fn linear_round_trip_through_half() {
        let pixels = [[0.5, 0.25, 1.0, 1.0], [2.0, 0.0, 0.125, 0.5]];
        let data = PixelData::from_linear(Size::new(2, 1), PixelFormat::Rgba16F, &pixels);
        assert_eq!(data.format(), PixelFormat::Rgba16F);
        assert_eq!(data.to_linear(), pixels.to_vec());
    }
}
