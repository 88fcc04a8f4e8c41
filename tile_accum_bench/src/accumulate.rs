// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::hint::black_box;

use criterion::Criterion;
use tile_accum::OverlappedAccumulator;
use tile_accum_common::geom::{IVec2, Size, Vec2};
use tile_accum_common::pixel::PixelFormat;
use tile_accum_common::weight::TileWeight1D;

use crate::{PAD, TILE_SIZE, pattern};

pub fn accumulate(c: &mut Criterion) {
    let mut g = c.benchmark_group("accumulate");

    let padded = Size::new(TILE_SIZE.width + 2 * PAD, TILE_SIZE.height + 2 * PAD);
    let pixels = pattern(padded);
    let weight_x = TileWeight1D::new(PAD, TILE_SIZE.width, PAD);
    let weight_y = TileWeight1D::new(PAD, TILE_SIZE.height, PAD);
    let plane = Size::new(TILE_SIZE.width * 2, TILE_SIZE.height * 2);
    let offset = IVec2::new(TILE_SIZE.width as i32 - PAD as i32, -(PAD as i32));

    macro_rules! accumulate_single {
        ($name:ident, $gamma:expr, $shift:expr) => {
            let mut acc = OverlappedAccumulator::new();
            acc.init_memory(plane, 4);
            acc.set_gamma($gamma);

            g.bench_function(stringify!($name), |b| {
                b.iter(|| {
                    acc.accumulate(
                        black_box(&pixels),
                        padded,
                        offset,
                        $shift,
                        &weight_x,
                        &weight_y,
                    );
                });
            });
        };
    }

    accumulate_single!(aligned, 1.0, Vec2::ZERO);
    accumulate_single!(jittered, 1.0, Vec2::new(0.25, 0.75));
    accumulate_single!(gamma, 2.2, Vec2::ZERO);

    let mut acc = OverlappedAccumulator::new();
    acc.init_memory(plane, 4);
    for ty in 0..2 {
        for tx in 0..2 {
            let offset = IVec2::new(
                (tx * TILE_SIZE.width) as i32 - PAD as i32,
                (ty * TILE_SIZE.height) as i32 - PAD as i32,
            );
            acc.accumulate(&pixels, padded, offset, Vec2::ZERO, &weight_x, &weight_y);
        }
    }
    g.bench_function("fetch_f16", |b| {
        b.iter(|| black_box(acc.fetch(PixelFormat::Rgba16F)));
    });
    g.bench_function("fetch_u8", |b| {
        b.iter(|| black_box(acc.fetch(PixelFormat::Rgba8)));
    });
}
