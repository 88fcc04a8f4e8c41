// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resampling of samples that come back at an unexpected resolution.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};
use tile_accum_common::geom::Size;
use tile_accum_common::pixel::LinearPixel;

use crate::options::ResizeFilter;

impl ResizeFilter {
    fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
        }
    }
}

/// Resample a linear float image from `from` to `to`.
///
/// Some producers (post-process passes in particular) render at a different resolution
/// than was asked for. The accumulator only deals in the padded tile size, so such images
/// are stretched to fit rather than rejected.
///
/// Returns `None` when either size is empty or `pixels` does not hold a `from` image, as
/// there is nothing to stretch.
pub(crate) fn resample(
    pixels: &[LinearPixel],
    from: Size,
    to: Size,
    filter: ResizeFilter,
) -> Option<Vec<LinearPixel>> {
    if from.is_empty() || to.is_empty() || pixels.len() != from.area() {
        return None;
    }
    if from == to {
        return Some(pixels.to_vec());
    }

    let raw: Vec<f32> = pixels.iter().flatten().copied().collect();
    let source = ImageBuffer::<Rgba<f32>, Vec<f32>>::from_raw(from.width, from.height, raw)?;
    let resized = imageops::resize(&source, to.width, to.height, filter.filter_type());

    Some(
        resized
            .into_raw()
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect(),
    )
}
