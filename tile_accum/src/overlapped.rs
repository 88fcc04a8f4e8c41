// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The weighted accumulation buffer.

use std::borrow::Cow;
use std::ops::Range;

use tile_accum_common::geom::{IVec2, Size, Vec2};
use tile_accum_common::pixel::{LinearPixel, PixelData, PixelFormat};
use tile_accum_common::weight::TileWeight1D;

/// Accumulates overlapping, weighted images into one output frame.
///
/// Every output pixel keeps a running weighted sum per channel and the running sum of the
/// weights. [`fetch`](Self::fetch) divides one by the other. Accumulation is additive, so
/// the order in which samples arrive only affects floating point rounding.
///
/// The buffer is allocated by [`init_memory`](Self::init_memory) and released again by
/// [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct OverlappedAccumulator {
    plane_size: Size,
    /// Zero when no memory is allocated.
    num_channels: u8,
    gamma: f32,
    sums: Vec<LinearPixel>,
    weights: Vec<f32>,
}

impl Default for OverlappedAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlappedAccumulator {
    /// Create an accumulator without any memory.
    pub fn new() -> Self {
        Self {
            plane_size: Size::default(),
            num_channels: 0,
            gamma: 1.0,
            sums: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Allocate zeroed planes for a frame of `size` with 3 or 4 accumulated channels.
    ///
    /// With 3 channels alpha is not accumulated and always fetched as fully opaque.
    pub fn init_memory(&mut self, size: Size, num_channels: u8) {
        debug_assert!(
            num_channels == 3 || num_channels == 4,
            "only RGB and RGBA accumulation is supported"
        );
        self.plane_size = size;
        self.num_channels = num_channels;
        self.sums.clear();
        self.sums.resize(size.area(), [0.0; 4]);
        self.weights.clear();
        self.weights.resize(size.area(), 0.0);
    }

    /// Zero the accumulated sums and weights, keeping the allocation.
    pub fn zero_planes(&mut self) {
        self.sums.fill([0.0; 4]);
        self.weights.fill(0.0);
    }

    /// Release the planes and forget the channel count.
    pub fn reset(&mut self) {
        self.plane_size = Size::default();
        self.num_channels = 0;
        self.gamma = 1.0;
        self.sums = Vec::new();
        self.weights = Vec::new();
    }

    /// Whether [`init_memory`](Self::init_memory) has been called since the last reset.
    pub fn is_initialized(&self) -> bool {
        self.num_channels != 0
    }

    /// The size of the planes, zero when no memory is allocated.
    pub fn plane_size(&self) -> Size {
        self.plane_size
    }

    /// The number of accumulated channels, zero when no memory is allocated.
    pub fn num_channels(&self) -> u8 {
        self.num_channels
    }

    /// The gamma colour channels are decoded and re-encoded with.
    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    /// Set the gamma colour channels are decoded with on the way in and re-encoded with on
    /// the way out.
    pub fn set_gamma(&mut self, gamma: f32) {
        debug_assert!(gamma.is_finite() && gamma > 0.0, "invalid gamma {gamma}");
        self.gamma = gamma;
    }

    /// Add a padded sample to the planes.
    ///
    /// `pixels` is a `size` image in linear floats whose top-left pixel lands at `offset`
    /// in the output frame. `shift` is the remaining sub-pixel offset in `[0, 1)`, applied by
    /// splatting each pixel bilinearly over its 2x2 destination neighbourhood. Pixels falling
    /// outside the frame are dropped.
    pub fn accumulate(
        &mut self,
        pixels: &[LinearPixel],
        size: Size,
        offset: IVec2,
        shift: Vec2,
        weight_x: &TileWeight1D,
        weight_y: &TileWeight1D,
    ) {
        assert_eq!(
            pixels.len(),
            size.area(),
            "Expected `pixels` to have length of exactly `width * height`"
        );
        if !self.is_initialized() {
            log::warn!("Dropping a sample accumulated before the planes were initialized");
            return;
        }
        if size.is_empty() || self.plane_size.is_empty() {
            return;
        }

        let pixels = if self.gamma == 1.0 {
            Cow::Borrowed(pixels)
        } else {
            let gamma = self.gamma;
            Cow::Owned(
                pixels
                    .iter()
                    .map(|p| {
                        [
                            decode(p[0], gamma),
                            decode(p[1], gamma),
                            decode(p[2], gamma),
                            p[3],
                        ]
                    })
                    .collect(),
            )
        };
        let source = Source {
            pixels: &pixels,
            width: i64::from(size.width),
            height: i64::from(size.height),
            offset: (i64::from(offset.x), i64::from(offset.y)),
            shift,
            weight_x: weight_x.pixel_weights(size.width),
            weight_y: weight_y.pixel_weights(size.height),
            channels: usize::from(self.num_channels),
        };

        let plane_width = i64::from(self.plane_size.width);
        let plane_height = i64::from(self.plane_size.height);
        let spill_x = i64::from(shift.x > 0.0);
        let spill_y = i64::from(shift.y > 0.0);
        let (ox, oy) = source.offset;
        let xs = ox.max(0)..(ox + source.width + spill_x).min(plane_width);
        let ys = oy.max(0)..(oy + source.height + spill_y).min(plane_height);
        if xs.is_empty() || ys.is_empty() {
            return;
        }

        let row_len = self.plane_size.width as usize;
        let rows = ys.start as usize * row_len..ys.end as usize * row_len;
        let sums = &mut self.sums[rows.clone()];
        let weights = &mut self.weights[rows];
        let first_row = ys.start;

        #[cfg(feature = "multithreading")]
        {
            use rayon::prelude::*;

            sums.par_chunks_mut(row_len)
                .zip(weights.par_chunks_mut(row_len))
                .enumerate()
                .for_each(|(row, (sums, weights))| {
                    source.accumulate_row(first_row + row as i64, xs.clone(), sums, weights);
                });
        }
        #[cfg(not(feature = "multithreading"))]
        {
            sums.chunks_mut(row_len)
                .zip(weights.chunks_mut(row_len))
                .enumerate()
                .for_each(|(row, (sums, weights))| {
                    source.accumulate_row(first_row + row as i64, xs.clone(), sums, weights);
                });
        }
    }

    /// The number of output pixels no sample has contributed to.
    pub fn coverage_gaps(&self) -> usize {
        self.weights.iter().filter(|w| **w <= 0.0).count()
    }

    /// Normalize the planes into linear RGBA.
    ///
    /// Every output pixel must have been covered by some sample. A gap is a logic error: it
    /// fails a debug assertion, and in release builds is logged and emitted as transparent
    /// black.
    pub fn fetch_linear(&self) -> Vec<LinearPixel> {
        if let Some(first) = self.weights.iter().position(|w| *w <= 0.0) {
            let gaps = self.coverage_gaps();
            let width = self.plane_size.width.max(1) as usize;
            log::error!(
                "{gaps} of {} accumulated pixels were never covered by a sample, first at ({}, {})",
                self.weights.len(),
                first % width,
                first / width
            );
            debug_assert!(gaps == 0, "accumulation left {gaps} pixels without coverage");
        }

        let channels = usize::from(self.num_channels);
        let inv_gamma = 1.0 / self.gamma;
        let normalize = |(sum, weight): (&LinearPixel, &f32)| -> LinearPixel {
            if *weight <= 0.0 {
                return [0.0; 4];
            }
            let mut out = [0.0, 0.0, 0.0, 1.0];
            for (value, sum) in out[..channels].iter_mut().zip(sum) {
                *value = sum / *weight;
            }
            if inv_gamma != 1.0 {
                for value in &mut out[..3] {
                    *value = decode(*value, inv_gamma);
                }
            }
            out
        };

        #[cfg(feature = "multithreading")]
        {
            use rayon::prelude::*;

            self.sums
                .par_iter()
                .zip(self.weights.par_iter())
                .map(normalize)
                .collect()
        }
        #[cfg(not(feature = "multithreading"))]
        {
            self.sums.iter().zip(self.weights.iter()).map(normalize).collect()
        }
    }

    /// Normalize the planes into an image of the given format.
    pub fn fetch(&self, format: PixelFormat) -> PixelData {
        PixelData::from_linear(self.plane_size, format, &self.fetch_linear())
    }
}

/// Raise a colour channel to `gamma`, treating negative values as black.
#[inline]
fn decode(value: f32, gamma: f32) -> f32 {
    value.max(0.0).powf(gamma)
}

/// A gamma-decoded sample positioned in the output frame.
struct Source<'a> {
    pixels: &'a [LinearPixel],
    width: i64,
    height: i64,
    offset: (i64, i64),
    shift: Vec2,
    weight_x: Vec<f32>,
    weight_y: Vec<f32>,
    channels: usize,
}

impl Source<'_> {
    /// Gather every contribution to one output row.
    ///
    /// An output pixel receives from at most two source columns and two source rows: the
    /// pixel at the same position with weight `1 - shift` and its predecessor with weight
    /// `shift`.
    fn accumulate_row(
        &self,
        dest_y: i64,
        xs: Range<i64>,
        sums: &mut [LinearPixel],
        weights: &mut [f32],
    ) {
        let (ox, oy) = self.offset;
        let (sx, sy) = (self.shift.x, self.shift.y);
        let taps_y = [(dest_y - oy, 1.0 - sy), (dest_y - oy - 1, sy)];

        for dest_x in xs {
            let taps_x = [(dest_x - ox, 1.0 - sx), (dest_x - ox - 1, sx)];
            let mut sum = [0.0_f32; 4];
            let mut total = 0.0_f32;

            for (j, bilinear_y) in taps_y {
                if bilinear_y == 0.0 || j < 0 || j >= self.height {
                    continue;
                }
                let row_weight = self.weight_y[j as usize] * bilinear_y;
                if row_weight == 0.0 {
                    continue;
                }
                for (i, bilinear_x) in taps_x {
                    if bilinear_x == 0.0 || i < 0 || i >= self.width {
                        continue;
                    }
                    let weight = row_weight * bilinear_x * self.weight_x[i as usize];
                    if weight == 0.0 {
                        continue;
                    }
                    let pixel = &self.pixels[(j * self.width + i) as usize];
                    for (sum, value) in sum[..self.channels].iter_mut().zip(pixel) {
                        *sum += weight * value;
                    }
                    total += weight;
                }
            }

            if total > 0.0 {
                let idx = dest_x as usize;
                for (dst, src) in sums[idx][..self.channels].iter_mut().zip(&sum) {
                    *dst += src;
                }
                weights[idx] += total;
            }
        }
    }
}
