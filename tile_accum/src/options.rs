// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::num::NonZeroUsize;

/// Parameters passed along with every submitted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationParams {
    /// Accumulate the alpha channel as well as colour.
    ///
    /// When `false` alpha is ignored and the output is fully opaque.
    pub accumulate_alpha: bool,
    /// Emit a copy of every sample through [`OutputSink::on_single_sample`] before it is
    /// accumulated.
    ///
    /// [`OutputSink::on_single_sample`]: crate::OutputSink::on_single_sample
    pub write_samples: bool,
}

impl Default for AccumulationParams {
    fn default() -> Self {
        Self {
            accumulate_alpha: true,
            write_samples: false,
        }
    }
}

impl AccumulationParams {
    /// The number of channels accumulated for these parameters.
    pub fn num_channels(&self) -> u8 {
        if self.accumulate_alpha {
            4
        } else {
            3
        }
    }
}

/// When a [`TileAccumulator`](crate::TileAccumulator) considers a frame complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Complete once as many samples as the frame's grid holds have been accumulated.
    ///
    /// Samples may arrive in any order.
    #[default]
    AllSamples,
    /// Complete as soon as the sample for the last tile, last temporal sample and last
    /// spatial sample arrives.
    ///
    /// This relies on the producer submitting that sample last.
    LastSample,
}

/// The filter used to resample samples that do not have the expected padded size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Nearest neighbour.
    Nearest,
    /// Linear interpolation (a triangle filter when downscaling).
    #[default]
    Bilinear,
    /// Catmull-Rom cubic.
    CatmullRom,
}

/// Options for a single [`TileAccumulator`](crate::TileAccumulator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulatorOptions {
    /// When a frame is complete.
    pub completion: CompletionPolicy,
    /// How mismatched samples are resampled.
    pub resize_filter: ResizeFilter,
}

/// Options for an [`AccumulatorPool`](crate::AccumulatorPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// The number of frames (or passes) that can be accumulated at the same time.
    pub instance_count: NonZeroUsize,
    /// Options every instance is created with.
    pub accumulator: AccumulatorOptions,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            instance_count: NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN),
            accumulator: AccumulatorOptions::default(),
        }
    }
}
