// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The separable weight function used to cross-fade overlapping tiles.

/// A piecewise linear weight along one axis of a padded tile.
///
/// ```text
///  1 |        ____________
///    |       /            \
///  0 |______/              \______
///    0     x0  x1      x2  x3    len
/// ```
///
/// For a tile with `pad_left` pixels of padding, `size` pixels of content and `pad_right`
/// pixels of padding, the ramps are centred on the tile's nominal edges and are as wide as
/// the padding. Two neighbouring tiles sharing an overlap therefore have complementary
/// ramps: their weights sum to exactly one across the overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileWeight1D {
    x0: f32,
    x1: f32,
    x2: f32,
    x3: f32,
}

impl TileWeight1D {
    /// Build the weight function for a padded tile.
    ///
    /// `size` must be at least as large as either pad, otherwise the ramps overlap.
    pub fn new(pad_left: u32, size: u32, pad_right: u32) -> Self {
        debug_assert!(
            size >= pad_left && size >= pad_right,
            "tile content must be at least as large as its padding"
        );
        let pad_left = pad_left as f32;
        let pad_right = pad_right as f32;
        let size = size as f32;
        Self {
            x0: 0.5 * pad_left,
            x1: 1.5 * pad_left,
            x2: pad_left + size - 0.5 * pad_right,
            x3: pad_left + size + 0.5 * pad_right,
        }
    }

    /// The weight at a continuous position along the padded tile.
    pub fn weight(&self, x: f32) -> f32 {
        if x < self.x0 {
            0.0
        } else if x < self.x1 {
            (x - self.x0) / (self.x1 - self.x0)
        } else if x <= self.x2 {
            1.0
        } else if x < self.x3 {
            (self.x3 - x) / (self.x3 - self.x2)
        } else {
            0.0
        }
    }

    /// The weight at the centre of pixel `index`.
    pub fn pixel_weight(&self, index: u32) -> f32 {
        self.weight(index as f32 + 0.5)
    }

    /// The weights of the first `len` pixels.
    pub fn pixel_weights(&self, len: u32) -> Vec<f32> {
        (0..len).map(|i| self.pixel_weight(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::TileWeight1D;

    #[test]
    fn unpadded_tile_has_full_weight() {
        let w = TileWeight1D::new(0, 8, 0);
        assert_eq!(w.pixel_weights(8), vec![1.0; 8]);
        assert_eq!(w.pixel_weight(8), 0.0);
    }

    #[test]
    fn ramps_are_centred_on_tile_edges() {
        let w = TileWeight1D::new(4, 8, 4);
        let weights = w.pixel_weights(16);
        assert_eq!(
            weights,
            vec![
                0.0, 0.0, 0.125, 0.375, 0.625, 0.875, 1.0, 1.0, 1.0, 1.0, 0.875, 0.625, 0.375,
                0.125, 0.0, 0.0
            ]
        );
    }

    #[test]
    fn neighbouring_ramps_sum_to_one() {
        let (pad, size) = (8, 16);
        let left = TileWeight1D::new(pad, size, pad);
        let right = TileWeight1D::new(pad, size, pad);
        // The right tile's padded origin sits `size` pixels after the left tile's.
        for local in 0..(2 * pad) {
            let a = left.pixel_weight(local + size);
            let b = right.pixel_weight(local);
            assert!((a + b - 1.0).abs() < 1e-6, "{a} + {b} at {local}");
        }
    }
}
