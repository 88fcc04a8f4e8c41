// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate holds the data model shared by the [tile accumulator][tile_accum]: pixel
//! buffers in the three supported formats, the metadata attached to each rendered sample,
//! and the separable weight function used to cross-fade overlapping tiles.
//!
//! # Usage
//!
//! Producers build a [`Sample`][crate::sample::Sample] from a [`PixelData`][crate::pixel::PixelData]
//! (usually straight from a readback with [`PixelData::from_bytes`][crate::pixel::PixelData::from_bytes])
//! and a [`SampleState`][crate::sample::SampleState] describing where the sample sits in
//! the tile/temporal/spatial grid. Everything else happens in `tile_accum`.
//!
//! # Contents
//!
//! - [`geom`]: small integer and float vectors.
//! - [`pixel`]: pixel formats and owned pixel buffers.
//! - [`sample`]: per-sample metadata and the geometry derived from it.
//! - [`weight`]: the 1-D tile weight function.
//!
//! [tile_accum]: https://docs.rs/tile_accum
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

pub mod geom;
pub mod pixel;
pub mod sample;
pub mod weight;

pub use half;

use thiserror::Error;

/// Errors raised while building pixel buffers or validating sample metadata.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The raw bytes do not describe a whole number of pixels.
    #[error("{len} bytes is not a whole number of {bytes_per_pixel}-byte pixels")]
    PartialPixel {
        /// Length of the byte buffer.
        len: usize,
        /// Size of one pixel in the requested format.
        bytes_per_pixel: usize,
    },
    /// The sample metadata describes an impossible tile/sample grid.
    #[error("Invalid sample state: {0}")]
    InvalidSampleState(&'static str),
}
