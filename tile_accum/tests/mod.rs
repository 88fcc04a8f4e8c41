// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integration tests for `tile_accum`.
//!
//! - `util` holds the sample builders and assertions shared by the other modules.
//! - `tiling` covers accumulation through a single [`TileAccumulator`]: overlap blending,
//!   jitter, gamma, resampling and the fast path.
//! - `pool` covers the [`AccumulatorPool`] under concurrent use.
//!
//! [`TileAccumulator`]: tile_accum::TileAccumulator
//! [`AccumulatorPool`]: tile_accum::AccumulatorPool

#![allow(missing_docs, reason = "we don't need docs for testing")]
#![allow(clippy::cast_possible_truncation, reason = "not critical for testing")]

mod util;
