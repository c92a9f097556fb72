//! Binary cross-entropy on logits, with optional class weighting.
//!
//! Numerically stable form: `L_i = max(x_i, 0) - x_i t_i + ln(1 + e^{-|x_i|})`,
//! gradient `σ(x_i) - t_i`. Class weights scale each sample's loss and
//! gradient by the weight of its true class; validation and evaluation use
//! the unweighted mean, matching the usual fit/evaluate asymmetry.

use ndarray::{Array1, ArrayView1};

use crate::class_weight::ClassWeights;
use crate::model::sigmoid;

/// Stable per-sample BCE on a logit.
fn stable_bce(logit: f32, target: f32) -> f32 {
    logit.max(0.0) - logit * target + (1.0 + (-logit.abs()).exp()).ln()
}

/// Unweighted mean BCE over a batch of logits.
pub fn bce_mean(logits: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32 {
    assert_eq!(logits.len(), targets.len(), "logits and targets must have same length");
    if logits.is_empty() {
        return 0.0;
    }
    logits
        .iter()
        .zip(targets.iter())
        .map(|(&x, &t)| stable_bce(x, t))
        .sum::<f32>()
        / logits.len() as f32
}

/// Training loss: BCE with optional balanced class weights.
pub struct BinaryCrossEntropy {
    class_weights: Option<ClassWeights>,
}

impl BinaryCrossEntropy {
    /// Unweighted BCE.
    pub fn new() -> Self {
        Self {
            class_weights: None,
        }
    }

    /// BCE with per-class sample weights.
    pub fn with_class_weights(class_weights: ClassWeights) -> Self {
        Self {
            class_weights: Some(class_weights),
        }
    }

    /// True when a class-weight map is wired in.
    pub fn is_weighted(&self) -> bool {
        self.class_weights.is_some()
    }

    /// Compute `(mean loss, d loss / d logits)` for one batch.
    pub fn forward(&self, logits: &Array1<f32>, targets: ArrayView1<f32>) -> (f32, Array1<f32>) {
        assert_eq!(logits.len(), targets.len(), "logits and targets must have same length");
        let n = logits.len() as f32;

        let mut total = 0.0;
        let mut grad = Array1::zeros(logits.len());
        for (i, (&x, &t)) in logits.iter().zip(targets.iter()).enumerate() {
            let w = self
                .class_weights
                .as_ref()
                .map_or(1.0, |cw| cw.for_label(t));
            total += w * stable_bce(x, t);
            grad[i] = w * (sigmoid(x) - t) / n;
        }
        (total / n, grad)
    }
}

impl Default for BinaryCrossEntropy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_weight::balanced_class_weights;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn perfect_confident_predictions_give_near_zero_loss() {
        let logits = arr1(&[10.0, -10.0]);
        let targets = arr1(&[1.0, 0.0]);
        let (loss, grad) = BinaryCrossEntropy::new().forward(&logits, targets.view());
        assert!(loss < 1e-3);
        assert!(grad.iter().all(|g| g.abs() < 1e-3));
    }

    #[test]
    fn gradient_is_sigmoid_minus_target_over_n() {
        let logits = arr1(&[0.0, 2.0]);
        let targets = arr1(&[1.0, 0.0]);
        let (_, grad) = BinaryCrossEntropy::new().forward(&logits, targets.view());
        assert_relative_eq!(grad[0], (0.5 - 1.0) / 2.0, epsilon = 1e-6);
        assert_relative_eq!(grad[1], (sigmoid(2.0) - 0.0) / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn matches_naive_formula_in_safe_range() {
        let logits = arr1(&[0.5, -0.3]);
        let targets = arr1(&[1.0, 0.0]);
        let loss = bce_mean(logits.view(), targets.view());

        let naive: f32 = logits
            .iter()
            .zip(targets.iter())
            .map(|(&x, &t)| {
                let p = sigmoid(x);
                -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            })
            .sum::<f32>()
            / 2.0;
        assert_relative_eq!(loss, naive, epsilon = 1e-5);
    }

    #[test]
    fn class_weights_scale_minority_gradient() {
        // 1 positive vs 3 negatives: positives weigh 2x negatives ratio.
        let labels = arr1(&[0.0, 0.0, 0.0, 1.0]);
        let cw = balanced_class_weights(labels.view()).unwrap();
        let weighted = BinaryCrossEntropy::with_class_weights(cw.clone());
        let plain = BinaryCrossEntropy::new();

        let logits = arr1(&[0.0, 0.0, 0.0, 0.0]);
        let (_, gw) = weighted.forward(&logits, labels.view());
        let (_, gp) = plain.forward(&logits, labels.view());

        assert_relative_eq!(gw[3] / gp[3], cw.get(1), epsilon = 1e-5);
        assert_relative_eq!(gw[0] / gp[0], cw.get(0), epsilon = 1e-5);
    }

    #[test]
    fn extreme_logits_stay_finite() {
        let logits = arr1(&[500.0, -500.0]);
        let targets = arr1(&[0.0, 1.0]);
        let loss = bce_mean(logits.view(), targets.view());
        assert!(loss.is_finite());
        assert!(loss > 100.0);
    }
}
