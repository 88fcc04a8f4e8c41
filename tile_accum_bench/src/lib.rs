// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(missing_docs, reason = "Not needed for benchmarks")]

use tile_accum_common::geom::Size;
use tile_accum_common::pixel::LinearPixel;

pub mod accumulate;
pub mod submit;

/// Nominal size of one tile.
pub const TILE_SIZE: Size = Size::new(256, 256);
/// Overlap padding on each side of a tile.
pub const PAD: u32 = 32;

/// A deterministic, non-constant test image.
pub fn pattern(size: Size) -> Vec<LinearPixel> {
    (0..size.height)
        .flat_map(|y| {
            (0..size.width).map(move |x| {
                let v = ((x * 7 + y * 13) % 256) as f32 / 255.0;
                [v, 1.0 - v, 0.5 * v, 1.0]
            })
        })
        .collect()
}
