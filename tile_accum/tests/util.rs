// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions shared across different tests.

use std::sync::Arc;

use anyhow::{Result, bail};
use crossbeam_channel::Receiver;
use tile_accum::tile_accum_common::geom::{Size, UVec2};
use tile_accum::tile_accum_common::pixel::{LinearPixel, PixelData, PixelFormat};
use tile_accum::tile_accum_common::sample::{PassIdentifier, Sample, SampleState};
use tile_accum::{AccumulatorOptions, ChannelSink, OutputImage, SinkEvent, TileAccumulator};

pub(crate) const RED: LinearPixel = [1.0, 0.0, 0.0, 1.0];
pub(crate) const BLUE: LinearPixel = [0.0, 0.0, 1.0, 1.0];

pub(crate) fn accumulator(options: AccumulatorOptions) -> (TileAccumulator, Receiver<SinkEvent>) {
    let (sink, events) = ChannelSink::new();
    (TileAccumulator::new(options, Arc::new(sink)), events)
}

/// Metadata for one tile of a `tile_count` grid of `tile_size` tiles with `pad` pixels of
/// overlap on every side.
pub(crate) fn tile_state(
    frame_number: u64,
    tile_index: UVec2,
    tile_count: UVec2,
    tile_size: Size,
    pad: u32,
) -> SampleState {
    SampleState {
        tile_index,
        tile_count,
        overlap_pad: UVec2::new(pad, pad),
        ..SampleState::new(frame_number, PassIdentifier::default(), tile_size)
    }
}

pub(crate) fn solid(size: Size, format: PixelFormat, color: LinearPixel) -> PixelData {
    PixelData::from_linear(size, format, &vec![color; size.area()])
}

/// A sample filled with `color` at the padded size its metadata asks for.
pub(crate) fn solid_sample(state: SampleState, color: LinearPixel) -> Sample {
    let pixels = solid(state.overlap_padded_size(), PixelFormat::Rgba32F, color);
    Sample::new(pixels, state)
}

/// A smooth, non-symmetric gradient.
pub(crate) fn gradient(size: Size) -> Vec<LinearPixel> {
    let (w, h) = (size.width as f32, size.height as f32);
    (0..size.height)
        .flat_map(|y| {
            (0..size.width).map(move |x| {
                let (u, v) = ((x as f32 + 0.5) / w, (y as f32 + 0.5) / h);
                [u, v, 0.5 * (u + v), 1.0 - 0.5 * u]
            })
        })
        .collect()
}

/// Take the next event, which must be a completed frame.
pub(crate) fn next_complete_pass(events: &Receiver<SinkEvent>) -> Result<OutputImage> {
    match events.try_recv() {
        Ok(SinkEvent::CompletePass(image)) => Ok(image),
        Ok(other) => bail!("expected a completed frame, got {other:?}"),
        Err(err) => bail!("expected a completed frame: {err}"),
    }
}

pub(crate) fn assert_pixels_close(
    actual: &[LinearPixel],
    expected: &[LinearPixel],
    tolerance: f32,
) {
    assert_eq!(actual.len(), expected.len(), "pixel count");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        for c in 0..4 {
            assert!(
                (a[c] - e[c]).abs() <= tolerance,
                "pixel {i}: got {a:?}, expected {e:?}"
            );
        }
    }
}
