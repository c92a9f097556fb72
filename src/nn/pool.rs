//! Spatial pooling: 2x2 average pooling and global average pooling.

use ndarray::{Array2, Array4, Axis};

/// 2x2 average pooling with stride 2 over `(batch, h, w, c)`.
///
/// Requires even spatial dimensions; the backbone skips pooling when a
/// dimension can no longer be halved.
pub fn avg_pool2(x: &Array4<f32>) -> Array4<f32> {
    let (b, h, w, c) = x.dim();
    debug_assert!(h % 2 == 0 && w % 2 == 0, "avg_pool2 requires even spatial dims");
    let (oh, ow) = (h / 2, w / 2);
    Array4::from_shape_fn((b, oh, ow, c), |(n, i, j, k)| {
        let (i2, j2) = (i * 2, j * 2);
        0.25 * (x[[n, i2, j2, k]]
            + x[[n, i2 + 1, j2, k]]
            + x[[n, i2, j2 + 1, k]]
            + x[[n, i2 + 1, j2 + 1, k]])
    })
}

/// Backward of [`avg_pool2`]: spreads each output gradient evenly over its
/// 2x2 input window.
pub fn avg_pool2_backward(dy: &Array4<f32>) -> Array4<f32> {
    let (b, oh, ow, c) = dy.dim();
    Array4::from_shape_fn((b, oh * 2, ow * 2, c), |(n, i, j, k)| {
        0.25 * dy[[n, i / 2, j / 2, k]]
    })
}

/// Global average pooling: `(batch, h, w, c)` to `(batch, c)`.
pub struct GlobalAvgPool {
    cached_hw: Option<(usize, usize)>,
}

impl GlobalAvgPool {
    pub fn new() -> Self {
        Self { cached_hw: None }
    }

    pub fn forward_train(&mut self, x: &Array4<f32>) -> Array2<f32> {
        let (_, h, w, _) = x.dim();
        self.cached_hw = Some((h, w));
        Self::pool(x)
    }

    pub fn forward_eval(&self, x: &Array4<f32>) -> Array2<f32> {
        Self::pool(x)
    }

    fn pool(x: &Array4<f32>) -> Array2<f32> {
        let (_, h, w, _) = x.dim();
        x.sum_axis(Axis(1)).sum_axis(Axis(1)) / (h * w) as f32
    }

    /// Backward: broadcast each channel gradient uniformly over the
    /// spatial positions it averaged.
    pub fn backward(&mut self, dy: &Array2<f32>) -> Array4<f32> {
        let (h, w) = self.cached_hw.expect("backward before forward_train");
        let (b, c) = dy.dim();
        let scale = 1.0 / (h * w) as f32;
        Array4::from_shape_fn((b, h, w, c), |(n, _, _, k)| dy[[n, k]] * scale)
    }

    /// Drop cached shape info.
    pub fn release_scratch(&mut self) {
        self.cached_hw = None;
    }
}

impl Default for GlobalAvgPool {
    fn default() -> Self {
        Self::new()
    }
}
