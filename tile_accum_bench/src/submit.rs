// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::hint::black_box;
use std::sync::Arc;

use criterion::Criterion;
use tile_accum::{AccumulationParams, AccumulatorOptions, OutputImage, OutputSink, TileAccumulator};
use tile_accum_common::geom::{Size, UVec2};
use tile_accum_common::pixel::{PixelData, PixelFormat};
use tile_accum_common::sample::{PassIdentifier, Sample, SampleState};

use crate::{PAD, TILE_SIZE, pattern};

/// Drops every image.
struct Discard;

impl OutputSink for Discard {
    fn on_single_sample(&self, image: OutputImage) {
        let _ = black_box(image);
    }

    fn on_complete_pass(&self, image: OutputImage) {
        let _ = black_box(image);
    }
}

/// Every sample of a frame of 3x2 tiles with two temporal samples each.
fn frame(format: PixelFormat, padded_size: Size) -> Vec<Sample> {
    let tile_count = UVec2::new(3, 2);
    let pixels = PixelData::from_linear(padded_size, format, &pattern(padded_size));
    let mut samples = vec![];
    for temporal_sample_index in 0..2 {
        for y in 0..tile_count.y {
            for x in 0..tile_count.x {
                let state = SampleState {
                    tile_index: UVec2::new(x, y),
                    tile_count,
                    overlap_pad: UVec2::new(PAD, PAD),
                    temporal_sample_index,
                    temporal_sample_count: 2,
                    accumulation_gamma: 2.2,
                    ..SampleState::new(0, PassIdentifier::default(), TILE_SIZE)
                };
                samples.push(Sample::new(pixels.clone(), state));
            }
        }
    }
    samples
}

pub fn submit(c: &mut Criterion) {
    let mut g = c.benchmark_group("submit");
    let padded = Size::new(TILE_SIZE.width + 2 * PAD, TILE_SIZE.height + 2 * PAD);

    macro_rules! submit_frame {
        ($name:ident, $format:expr, $size:expr) => {
            let samples = frame($format, $size);
            let mut acc = TileAccumulator::new(AccumulatorOptions::default(), Arc::new(Discard));
            let params = AccumulationParams::default();

            g.bench_function(stringify!($name), |b| {
                b.iter(|| {
                    for sample in samples.iter().cloned() {
                        let _ = acc.submit_sample(sample, &params);
                    }
                });
            });
        };
    }

    submit_frame!(frame_f16, PixelFormat::Rgba16F, padded);
    submit_frame!(frame_f32, PixelFormat::Rgba32F, padded);
    submit_frame!(frame_u8, PixelFormat::Rgba8, padded);
    submit_frame!(
        frame_f16_resized,
        PixelFormat::Rgba16F,
        Size::new(padded.width / 2, padded.height / 2)
    );
}
