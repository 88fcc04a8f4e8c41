// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-sample metadata and the tile geometry derived from it.
//!
//! A frame is rendered as a grid of tiles, each possibly rendered several times at different
//! sub-frame times (temporal samples) and sub-pixel jitters (spatial samples). Every tile is
//! rendered with an extra border of overlap padding on all sides, which is later cross-faded
//! with the neighbouring tiles' padding.

use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::geom::{IVec2, Size, UVec2, Vec2};
use crate::pixel::PixelData;
use crate::weight::TileWeight1D;

/// Identifies the render pass (layer, camera, ...) an output image belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassIdentifier(Arc<str>);

impl PassIdentifier {
    /// Create a new identifier from a name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The name of the pass.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for PassIdentifier {
    fn default() -> Self {
        Self::new("FinalImage")
    }
}

impl fmt::Display for PassIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a sample sits in the tile, temporal and spatial sample grid of one output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleState {
    /// The output frame this sample contributes to.
    pub frame_number: u64,
    /// The pass this sample was rendered for.
    pub pass: PassIdentifier,
    /// Index of this sample's tile.
    pub tile_index: UVec2,
    /// Number of tiles on each axis.
    pub tile_count: UVec2,
    /// Nominal (unpadded) tile size in pixels.
    pub tile_size: Size,
    /// Overlap padding rendered on each side of the tile, per axis.
    pub overlap_pad: UVec2,
    /// Index of the temporal sample.
    pub temporal_sample_index: u32,
    /// Number of temporal samples per frame.
    pub temporal_sample_count: u32,
    /// Index of the spatial sample.
    pub spatial_sample_index: u32,
    /// Number of spatial samples per temporal sample.
    pub spatial_sample_count: u32,
    /// Jitter applied to this sample, in pixels.
    pub subpixel_offset: Vec2,
    /// Gamma the sample's colour channels are decoded with before blending.
    pub accumulation_gamma: f32,
}

impl SampleState {
    /// Metadata for an untiled, unjittered frame of the given size.
    pub fn new(frame_number: u64, pass: PassIdentifier, size: Size) -> Self {
        Self {
            frame_number,
            pass,
            tile_index: UVec2::ZERO,
            tile_count: UVec2::ONE,
            tile_size: size,
            overlap_pad: UVec2::ZERO,
            temporal_sample_index: 0,
            temporal_sample_count: 1,
            spatial_sample_index: 0,
            spatial_sample_count: 1,
            subpixel_offset: Vec2::ZERO,
            accumulation_gamma: 1.0,
        }
    }

    /// Check the metadata describes a possible sample grid.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason| Err(Error::InvalidSampleState(reason));
        if self.tile_count.x == 0 || self.tile_count.y == 0 {
            return invalid("tile count must be at least one on each axis");
        }
        if self.tile_index.x >= self.tile_count.x || self.tile_index.y >= self.tile_count.y {
            return invalid("tile index out of range");
        }
        if self.tile_size.is_empty() {
            return invalid("tile size must be non-zero");
        }
        if self.overlap_pad.x > self.tile_size.width || self.overlap_pad.y > self.tile_size.height {
            return invalid("overlap pad larger than the tile");
        }
        if self.temporal_sample_count == 0
            || self.temporal_sample_index >= self.temporal_sample_count
        {
            return invalid("temporal sample index out of range");
        }
        if self.spatial_sample_count == 0 || self.spatial_sample_index >= self.spatial_sample_count
        {
            return invalid("spatial sample index out of range");
        }
        if !self.subpixel_offset.is_finite() {
            return invalid("sub-pixel offset must be finite");
        }
        if !(self.accumulation_gamma.is_finite() && self.accumulation_gamma > 0.0) {
            return invalid("accumulation gamma must be finite and positive");
        }
        if self.checked_overlap_padded_size().is_none() {
            return invalid("overlap padded tile size overflows");
        }
        if self.checked_accumulator_size().is_none() {
            return invalid("frame size overflows");
        }
        if self.checked_samples_per_frame().is_none() {
            return invalid("sample count per frame overflows");
        }
        if self.checked_overlapped_offset().is_none() {
            return invalid("tile offset does not fit in a signed 32-bit pixel coordinate");
        }
        Ok(())
    }

    /// Whether this is the top-left tile.
    pub fn is_first_tile(&self) -> bool {
        self.tile_index == UVec2::ZERO
    }

    /// Whether this is the bottom-right tile.
    pub fn is_last_tile(&self) -> bool {
        self.tile_index.x + 1 == self.tile_count.x && self.tile_index.y + 1 == self.tile_count.y
    }

    /// Whether this is the first temporal sample of the frame.
    pub fn is_first_temporal_sample(&self) -> bool {
        self.temporal_sample_index == 0
    }

    /// Whether this is the last temporal sample of the frame.
    pub fn is_last_temporal_sample(&self) -> bool {
        self.temporal_sample_index + 1 == self.temporal_sample_count
    }

    /// Whether this is the last spatial sample of its temporal sample.
    pub fn is_last_spatial_sample(&self) -> bool {
        self.spatial_sample_index + 1 == self.spatial_sample_count
    }

    /// Whether this sample alone makes up the whole frame, so there is nothing to blend.
    pub fn is_single_sample_frame(&self) -> bool {
        let one_tile = self.is_first_tile() && self.is_last_tile();
        let one_temporal = self.is_first_temporal_sample() && self.is_last_temporal_sample();
        one_tile && one_temporal && self.spatial_sample_count == 1
    }

    /// The number of samples that make up the whole frame.
    ///
    /// Saturates for metadata that [`validate`](Self::validate) rejects.
    pub fn samples_per_frame(&self) -> u64 {
        self.checked_samples_per_frame().unwrap_or(u64::MAX)
    }

    fn checked_samples_per_frame(&self) -> Option<u64> {
        u64::from(self.tile_count.x)
            .checked_mul(u64::from(self.tile_count.y))?
            .checked_mul(u64::from(self.temporal_sample_count))?
            .checked_mul(u64::from(self.spatial_sample_count))
    }

    /// The size a sample must have once its overlap padding is included.
    ///
    /// Saturates for metadata that [`validate`](Self::validate) rejects.
    pub fn overlap_padded_size(&self) -> Size {
        let padded = |size: u32, pad: u32| size.saturating_add(pad.saturating_mul(2));
        Size::new(
            padded(self.tile_size.width, self.overlap_pad.x),
            padded(self.tile_size.height, self.overlap_pad.y),
        )
    }

    fn checked_overlap_padded_size(&self) -> Option<Size> {
        let padded = |size: u32, pad: u32| size.checked_add(pad.checked_mul(2)?);
        Some(Size::new(
            padded(self.tile_size.width, self.overlap_pad.x)?,
            padded(self.tile_size.height, self.overlap_pad.y)?,
        ))
    }

    /// Whether an image of `size` can be accumulated without resampling.
    pub fn is_overlap_padded_size_valid(&self, size: Size) -> bool {
        size == self.overlap_padded_size()
    }

    /// The size of the full output frame: every nominal tile side by side.
    ///
    /// Saturates for metadata that [`validate`](Self::validate) rejects.
    pub fn accumulator_size(&self) -> Size {
        Size::new(
            self.tile_size.width.saturating_mul(self.tile_count.x),
            self.tile_size.height.saturating_mul(self.tile_count.y),
        )
    }

    fn checked_accumulator_size(&self) -> Option<Size> {
        Some(Size::new(
            self.tile_size.width.checked_mul(self.tile_count.x)?,
            self.tile_size.height.checked_mul(self.tile_count.y)?,
        ))
    }

    /// Where the padded sample's top-left pixel lands in the output frame, before any
    /// sub-pixel shift.
    ///
    /// The integer part of [`subpixel_offset`](Self::subpixel_offset) is folded in here.
    /// Clamps to the `i32` range for metadata that [`validate`](Self::validate) rejects.
    pub fn overlapped_offset(&self) -> IVec2 {
        let clamp = |v: i64| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        let (x, y) = self.overlapped_offset_wide();
        IVec2::new(clamp(x), clamp(y))
    }

    fn checked_overlapped_offset(&self) -> Option<IVec2> {
        let (x, y) = self.overlapped_offset_wide();
        Some(IVec2::new(i32::try_from(x).ok()?, i32::try_from(y).ok()?))
    }

    fn overlapped_offset_wide(&self) -> (i64, i64) {
        // `as` saturates for out of range floats, `saturating_*` keeps the sum from wrapping.
        let whole = |tile: u32, size: u32, pad: u32, jitter: f32| {
            i64::from(tile)
                .saturating_mul(i64::from(size))
                .saturating_sub(i64::from(pad))
                .saturating_add(jitter.floor() as i64)
        };
        (
            whole(
                self.tile_index.x,
                self.tile_size.width,
                self.overlap_pad.x,
                self.subpixel_offset.x,
            ),
            whole(
                self.tile_index.y,
                self.tile_size.height,
                self.overlap_pad.y,
                self.subpixel_offset.y,
            ),
        )
    }

    /// The fractional part of the jitter, in `[0, 1)` on each axis.
    pub fn overlapped_subpixel_shift(&self) -> Vec2 {
        let frac = |v: f32| {
            let f = v - v.floor();
            // `v - floor(v)` rounds up to 1.0 for tiny negative values.
            if f >= 1.0 {
                0.0
            } else {
                f
            }
        };
        Vec2::new(frac(self.subpixel_offset.x), frac(self.subpixel_offset.y))
    }

    /// The horizontal and vertical weight functions for this sample's padded tile.
    pub fn weight_functions(&self) -> (TileWeight1D, TileWeight1D) {
        (
            TileWeight1D::new(self.overlap_pad.x, self.tile_size.width, self.overlap_pad.x),
            TileWeight1D::new(self.overlap_pad.y, self.tile_size.height, self.overlap_pad.y),
        )
    }
}

/// One rendered sample: its pixels plus where it belongs.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// The rendered pixels.
    pub pixels: PixelData,
    /// Where the pixels belong.
    pub state: SampleState,
}

impl Sample {
    /// Pair pixels with their metadata.
    pub fn new(pixels: PixelData, state: SampleState) -> Self {
        Self { pixels, state }
    }
}
