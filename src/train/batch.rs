//! Batch gathering from index subsets.

use ndarray::{Array1, Array4, ArrayView1, ArrayView4, Axis};

/// Gather an image batch by sample index.
pub fn gather_images(x: ArrayView4<f32>, indices: &[usize]) -> Array4<f32> {
    x.select(Axis(0), indices)
}

/// Gather a label batch by sample index.
pub fn gather_labels(y: ArrayView1<f32>, indices: &[usize]) -> Array1<f32> {
    y.select(Axis(0), indices)
}
