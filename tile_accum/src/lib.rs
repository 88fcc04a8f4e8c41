// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile Accumulator combines many overlapping, weighted renders of one frame into a single
//! output image.
//!
//! A high quality frame is often rendered in pieces: split into tiles that do not fit on
//! the GPU at once, rendered several times at different sub-frame times for motion blur,
//! and several times again at different sub-pixel jitters for anti-aliasing. Each piece
//! (a *sample*) is rendered with a border of overlap padding. This crate blends the samples
//! back together, cross-fading the padding of neighbouring tiles so no seams are visible.
//!
//! ## Getting started
//!
//! ```
//! use std::sync::Arc;
//! use tile_accum::{AccumulationParams, AccumulatorPool, ChannelSink, PoolOptions, SinkEvent};
//! use tile_accum::tile_accum_common::geom::Size;
//! use tile_accum::tile_accum_common::pixel::{PixelData, PixelFormat};
//! use tile_accum::tile_accum_common::sample::{PassIdentifier, Sample, SampleState};
//!
//! # fn main() -> Result<(), tile_accum::Error> {
//! let (sink, events) = ChannelSink::new();
//! let pool = AccumulatorPool::new(PoolOptions::default(), Arc::new(sink));
//!
//! let size = Size::new(64, 32);
//! let state = SampleState::new(0, PassIdentifier::default(), size);
//! let pixels = PixelData::zeroed(size, PixelFormat::Rgba16F);
//! pool.submit(Sample::new(pixels, state), &AccumulationParams::default())?;
//!
//! let Ok(SinkEvent::CompletePass(image)) = events.try_recv() else {
//!     unreachable!("a single-sample frame is forwarded immediately");
//! };
//! assert_eq!(image.pixels.size(), size);
//! # Ok(())
//! # }
//! ```
//!
//! ## Structure
//!
//! - [`OverlappedAccumulator`] is the weighted buffer itself.
//! - [`TileAccumulator`] validates samples, resamples mismatched ones, decides when a frame
//!   is complete and emits it to an [`OutputSink`].
//! - [`AccumulatorPool`] hands out a bounded number of accumulators keyed by frame and pass,
//!   so samples can arrive from any thread.
//!
//! ## Features
//!
//! - `multithreading` (enabled by default): accumulate and normalise rows in parallel on
//!   the rayon thread pool.
// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

mod accumulator;
mod options;
mod overlapped;
mod pool;
mod resize;
mod sink;

pub use tile_accum_common;

pub use accumulator::{SubmitOutcome, TileAccumulator};
pub use options::{
    AccumulationParams, AccumulatorOptions, CompletionPolicy, PoolOptions, ResizeFilter,
};
pub use overlapped::OverlappedAccumulator;
pub use pool::{AccumulatorInstance, AccumulatorPool};
pub use sink::{ChannelSink, OutputImage, OutputSink, SinkEvent};

use thiserror::Error;
use tile_accum_common::geom::Size;
use tile_accum_common::pixel::PixelFormat;
use tile_accum_common::sample::PassIdentifier;

/// Errors that can occur while accumulating samples.
///
/// All of these indicate a broken producer and should be treated as fatal; a rejected
/// sample never modifies the accumulator it was submitted to.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The sample's pixel storage does not match its declared size and format.
    #[error(
        "Malformed {format:?} sample of {width}x{height}: expected {expected} bytes, got {actual}"
    )]
    MalformedSample {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Storage format.
        format: PixelFormat,
        /// Byte size implied by the declared geometry.
        expected: u64,
        /// Byte size actually stored.
        actual: u64,
    },
    /// The sample has no pixels.
    #[error("Empty {format:?} sample of {width}x{height}")]
    EmptySample {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Storage format.
        format: PixelFormat,
    },
    /// The sample's metadata is inconsistent.
    #[error(transparent)]
    InvalidSampleState(#[from] tile_accum_common::Error),
    /// A sample declared a different output size than earlier samples of the same frame.
    #[error("Sample declares a {actual:?} frame, but the frame being accumulated is {expected:?}")]
    InconsistentGeometry {
        /// Size of the frame being accumulated.
        expected: Size,
        /// Size declared by the rejected sample.
        actual: Size,
    },
    /// A sample declared a different accumulation gamma than earlier samples of the same frame.
    #[error("Sample declares gamma {actual}, but the frame being accumulated uses {expected}")]
    InconsistentGamma {
        /// Gamma of the frame being accumulated.
        expected: f32,
        /// Gamma declared by the rejected sample.
        actual: f32,
    },
    /// A sample was submitted to an accumulator instance serving another frame or pass.
    #[error("Accumulator instance is not bound to frame {frame_number} of pass `{pass}`")]
    InstanceNotBound {
        /// Frame number of the rejected sample.
        frame_number: u64,
        /// Pass of the rejected sample.
        pass: PassIdentifier,
    },
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
