//! Balanced class-weight estimation for imbalanced label sets.
//!
//! Weight for class `c` is `total / (n_classes * count(c))`, computed once
//! from the full training partition before fold iteration. The map feeds
//! the loss as per-sample weights (see `train::loss`).

use std::collections::BTreeMap;

use ndarray::ArrayView1;

use crate::error::{Error, Result};

/// Mapping from class label to inverse-frequency weight.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassWeights {
    weights: BTreeMap<u8, f32>,
}

impl ClassWeights {
    /// Weight for a discrete class.
    pub fn get(&self, class: u8) -> f32 {
        self.weights.get(&class).copied().unwrap_or(1.0)
    }

    /// Weight for a continuous binary label, thresholded at 0.5.
    pub fn for_label(&self, label: f32) -> f32 {
        self.get(u8::from(label >= 0.5))
    }

    /// Iterate over `(class, weight)` pairs in class order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, f32)> + '_ {
        self.weights.iter().map(|(&c, &w)| (c, w))
    }
}

/// Compute balanced class weights from binary labels.
///
/// Fails with [`Error::DegenerateLabels`] when fewer than two distinct
/// classes are present; weighting a single class is undefined.
pub fn balanced_class_weights(labels: ArrayView1<f32>) -> Result<ClassWeights> {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for &y in labels.iter() {
        *counts.entry(u8::from(y >= 0.5)).or_insert(0) += 1;
    }

    if counts.len() < 2 {
        return Err(Error::DegenerateLabels { found: counts.len() });
    }

    let total = labels.len() as f32;
    let n_classes = counts.len() as f32;
    let weights = counts
        .into_iter()
        .map(|(c, count)| (c, total / (n_classes * count as f32)))
        .collect();

    Ok(ClassWeights { weights })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    #[test]
    fn weight_ratio_is_inverse_count_ratio() {
        // 30 negatives, 70 positives: weight(0)/weight(1) == 70/30.
        let mut v = vec![0.0f32; 30];
        v.extend(std::iter::repeat(1.0).take(70));
        let y = Array1::from(v);

        let cw = balanced_class_weights(y.view()).unwrap();
        assert_relative_eq!(cw.get(0) / cw.get(1), 70.0 / 30.0, epsilon = 1e-5);
    }

    #[test]
    fn balanced_labels_give_unit_weights() {
        let mut v = vec![0.0f32; 50];
        v.extend(std::iter::repeat(1.0).take(50));
        let y = Array1::from(v);

        let cw = balanced_class_weights(y.view()).unwrap();
        assert_relative_eq!(cw.get(0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(cw.get(1), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn single_class_is_degenerate() {
        let y = Array1::from(vec![1.0f32; 20]);
        match balanced_class_weights(y.view()) {
            Err(Error::DegenerateLabels { found }) => assert_eq!(found, 1),
            other => panic!("expected DegenerateLabels, got {other:?}"),
        }
    }

    #[test]
    fn for_label_thresholds() {
        let mut v = vec![0.0f32; 10];
        v.extend(std::iter::repeat(1.0).take(30));
        let y = Array1::from(v);

        let cw = balanced_class_weights(y.view()).unwrap();
        assert_relative_eq!(cw.for_label(0.9), cw.get(1));
        assert_relative_eq!(cw.for_label(0.1), cw.get(0));
    }
}
