//! Binary classification metrics.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::ArrayView1;

/// Confusion counts accumulated over batches at a fixed threshold.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryCounts {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl BinaryCounts {
    /// Accumulate one batch of probabilities against binary targets.
    pub fn update(&mut self, probs: ArrayView1<f32>, targets: ArrayView1<f32>, threshold: f32) {
        assert_eq!(probs.len(), targets.len());
        for (&p, &t) in probs.iter().zip(targets.iter()) {
            let pred = p >= threshold;
            let truth = t >= 0.5;
            match (pred, truth) {
                (true, true) => self.tp += 1,
                (true, false) => self.fp += 1,
                (false, false) => self.tn += 1,
                (false, true) => self.fn_ += 1,
            }
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// Fraction of correct predictions; 0 when empty.
    pub fn accuracy(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.tp + self.tn) as f32 / total as f32
    }

    /// True positives over predicted positives; 0 when none predicted.
    pub fn precision(&self) -> f32 {
        let denom = self.tp + self.fp;
        if denom == 0 {
            return 0.0;
        }
        self.tp as f32 / denom as f32
    }

    /// True positives over actual positives; 0 when none present.
    pub fn recall(&self) -> f32 {
        let denom = self.tp + self.fn_;
        if denom == 0 {
            return 0.0;
        }
        self.tp as f32 / denom as f32
    }
}

/// Aggregate metrics from one evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalReport {
    pub loss: f32,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
}

impl EvalReport {
    /// The metrics as a named-key mapping.
    pub fn to_map(&self) -> BTreeMap<&'static str, f32> {
        BTreeMap::from([
            ("loss", self.loss),
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
        ])
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loss = {:.4}, Accuracy = {:.4}", self.loss, self.accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn counts_and_derived_metrics() {
        let mut counts = BinaryCounts::default();
        let probs = arr1(&[0.9, 0.8, 0.2, 0.6]);
        let targets = arr1(&[1.0, 0.0, 0.0, 1.0]);
        counts.update(probs.view(), targets.view(), 0.5);

        // tp=2 (0.9, 0.6), fp=1 (0.8), tn=1 (0.2), fn=0.
        assert_relative_eq!(counts.accuracy(), 0.75);
        assert_relative_eq!(counts.precision(), 2.0 / 3.0);
        assert_relative_eq!(counts.recall(), 1.0);
    }

    #[test]
    fn empty_counts_are_zero_not_nan() {
        let counts = BinaryCounts::default();
        assert_eq!(counts.accuracy(), 0.0);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.recall(), 0.0);
    }

    #[test]
    fn update_accumulates_across_batches() {
        let mut counts = BinaryCounts::default();
        counts.update(arr1(&[0.9]).view(), arr1(&[1.0]).view(), 0.5);
        counts.update(arr1(&[0.1]).view(), arr1(&[0.0]).view(), 0.5);
        assert_eq!(counts.total(), 2);
        assert_relative_eq!(counts.accuracy(), 1.0);
    }

    #[test]
    fn report_map_has_the_four_keys() {
        let report = EvalReport {
            loss: 0.5,
            accuracy: 0.9,
            precision: 0.8,
            recall: 0.7,
        };
        let map = report.to_map();
        for key in ["loss", "accuracy", "precision", "recall"] {
            assert!(map.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn report_display_format() {
        let report = EvalReport {
            loss: 0.12345,
            accuracy: 0.98765,
            precision: 1.0,
            recall: 1.0,
        };
        assert_eq!(report.to_string(), "Loss = 0.1235, Accuracy = 0.9877");
    }
}
