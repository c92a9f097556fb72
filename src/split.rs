//! Stratified k-fold splitter.
//!
//! Partitions sample indices into `k` disjoint validation folds while
//! preserving the label proportions of the full set in every fold. The
//! split is generated once per orchestration run from the fold RNG stream,
//! so identical seeds give identical fold assignments.

use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Stratified k-fold cross-validation splitter.
#[derive(Clone, Debug)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    /// Create a splitter producing `n_splits` folds.
    ///
    /// # Panics
    ///
    /// Panics if `n_splits < 2`; a single fold is not a cross-validation.
    pub fn new(n_splits: usize) -> Self {
        assert!(n_splits >= 2, "k-fold requires at least 2 splits");
        Self { n_splits }
    }

    /// Number of folds this splitter produces.
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate `(train_indices, val_indices)` per fold.
    ///
    /// Labels are thresholded at 0.5 into the two classes. Within each
    /// class the indices are shuffled once, then dealt into `n_splits`
    /// near-equal chunks; fold `i`'s validation set is chunk `i` of every
    /// class, which keeps per-fold label proportions close to the full set.
    pub fn split(&self, labels: ArrayView1<f32>, rng: &mut StdRng) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut positives: Vec<usize> = Vec::new();
        let mut negatives: Vec<usize> = Vec::new();
        for (i, &y) in labels.iter().enumerate() {
            if y >= 0.5 {
                positives.push(i);
            } else {
                negatives.push(i);
            }
        }
        positives.shuffle(rng);
        negatives.shuffle(rng);

        let mut val_folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for class in [&negatives, &positives] {
            for (fold, chunk) in chunks(class, self.n_splits).into_iter().enumerate() {
                val_folds[fold].extend(chunk);
            }
        }

        let n = labels.len();
        val_folds
            .into_iter()
            .map(|mut val| {
                val.sort_unstable();
                let mut in_val = vec![false; n];
                for &i in &val {
                    in_val[i] = true;
                }
                let train: Vec<usize> = (0..n).filter(|&i| !in_val[i]).collect();
                (train, val)
            })
            .collect()
    }
}

/// Split `items` into `k` near-equal chunks; the first `len % k` chunks get
/// one extra element.
fn chunks(items: &[usize], k: usize) -> Vec<Vec<usize>> {
    let base = items.len() / k;
    let remainder = items.len() % k;
    let mut out = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let extra = usize::from(i < remainder);
        let end = start + base + extra;
        out.push(items[start..end].to_vec());
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngContext;
    use ndarray::Array1;

    fn labels(n_neg: usize, n_pos: usize) -> Array1<f32> {
        let mut v = vec![0.0; n_neg];
        v.extend(std::iter::repeat(1.0).take(n_pos));
        Array1::from(v)
    }

    #[test]
    fn folds_cover_every_index_exactly_once() {
        let y = labels(60, 40);
        let folds = StratifiedKFold::new(5).split(y.view(), &mut RngContext::new(42).fold_stream());

        assert_eq!(folds.len(), 5);
        let mut seen = vec![0usize; 100];
        for (train, val) in &folds {
            assert_eq!(train.len() + val.len(), 100);
            for &i in val {
                seen[i] += 1;
            }
            // train and val are disjoint
            for &i in val {
                assert!(!train.contains(&i));
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn folds_are_stratified() {
        let y = labels(60, 40);
        let folds = StratifiedKFold::new(5).split(y.view(), &mut RngContext::new(42).fold_stream());

        for (_, val) in &folds {
            let pos = val.iter().filter(|&&i| y[i] >= 0.5).count();
            // 40% positives overall; each 20-sample fold should hold 8.
            assert_eq!(val.len(), 20);
            assert_eq!(pos, 8);
        }
    }

    #[test]
    fn identical_seed_gives_identical_assignment() {
        let y = labels(53, 47);
        let kf = StratifiedKFold::new(5);
        let a = kf.split(y.view(), &mut RngContext::new(7).fold_stream());
        let b = kf.split(y.view(), &mut RngContext::new(7).fold_stream());
        assert_eq!(a, b);

        let c = kf.split(y.view(), &mut RngContext::new(8).fold_stream());
        assert_ne!(a, c);
    }

    #[test]
    fn uneven_class_counts_stay_within_tolerance() {
        let y = labels(67, 33);
        let folds = StratifiedKFold::new(5).split(y.view(), &mut RngContext::new(42).fold_stream());

        let full_ratio = 33.0 / 100.0;
        for (_, val) in &folds {
            let pos = val.iter().filter(|&&i| y[i] >= 0.5).count() as f32;
            let ratio = pos / val.len() as f32;
            assert!((ratio - full_ratio).abs() < 0.05, "fold ratio {ratio} vs {full_ratio}");
        }
    }

    #[test]
    #[should_panic(expected = "at least 2 splits")]
    fn rejects_single_split() {
        StratifiedKFold::new(1);
    }
}
