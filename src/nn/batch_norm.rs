//! Batch normalization over the feature axis.

use ndarray::{Array1, Array2, ArrayD, Axis, IxDyn};

use super::param::Param;

/// Batch normalization for `(batch, features)` activations.
///
/// Training mode normalizes with batch statistics and updates the running
/// estimates; inference mode uses the running estimates only. `gamma` and
/// `beta` are the trainable scale and shift.
pub struct BatchNorm {
    gamma: Param,
    beta: Param,
    running_mean: Array1<f32>,
    running_var: Array1<f32>,
    momentum: f32,
    eps: f32,
    cached: Option<BnCache>,
}

struct BnCache {
    x_hat: Array2<f32>,
    inv_std: Array1<f32>,
}

impl BatchNorm {
    /// Create a batch-norm layer over `features` columns.
    pub fn new(features: usize) -> Self {
        Self {
            gamma: Param::new(ArrayD::ones(IxDyn(&[features]))),
            beta: Param::new(ArrayD::zeros(IxDyn(&[features]))),
            running_mean: Array1::zeros(features),
            running_var: Array1::ones(features),
            momentum: 0.99,
            eps: 1e-3,
            cached: None,
        }
    }

    /// Normalize with batch statistics; updates running estimates.
    pub fn forward_train(&mut self, x: &Array2<f32>) -> Array2<f32> {
        let n = x.nrows() as f32;
        let mean = x.mean_axis(Axis(0)).expect("non-empty batch");
        let centered = x - &mean;
        let var = centered.mapv(|v| v * v).mean_axis(Axis(0)).expect("non-empty batch");
        let inv_std = var.mapv(|v| 1.0 / (v + self.eps).sqrt());
        let x_hat = &centered * &inv_std;
        let y = &x_hat * &self.gamma.view1() + &self.beta.view1();

        // Running stats use the unbiased variance when the batch allows it.
        let unbiased = if n > 1.0 { &var * (n / (n - 1.0)) } else { var.clone() };
        self.running_mean = &self.running_mean * self.momentum + &mean * (1.0 - self.momentum);
        self.running_var = &self.running_var * self.momentum + &unbiased * (1.0 - self.momentum);

        self.cached = Some(BnCache { x_hat, inv_std });
        y
    }

    /// Normalize with running statistics; no caching, no updates.
    pub fn forward_eval(&self, x: &Array2<f32>) -> Array2<f32> {
        let inv_std = self.running_var.mapv(|v| 1.0 / (v + self.eps).sqrt());
        let x_hat = (x - &self.running_mean) * &inv_std;
        &x_hat * &self.gamma.view1() + &self.beta.view1()
    }

    /// Backward pass through batch statistics.
    pub fn backward(&mut self, dy: &Array2<f32>) -> Array2<f32> {
        let cache = self.cached.as_ref().expect("backward before forward_train");
        let n = dy.nrows() as f32;

        let dgamma = (dy * &cache.x_hat).sum_axis(Axis(0));
        let dbeta = dy.sum_axis(Axis(0));

        // dx = (gamma * inv_std / n) * (n*dy - sum(dy) - x_hat * sum(dy*x_hat))
        let dy_mean = &dbeta / n;
        let dyxhat_mean = &dgamma / n;
        let inner = dy - &dy_mean - &(&cache.x_hat * &dyxhat_mean);
        let scale = &self.gamma.view1().to_owned() * &cache.inv_std;
        let dx = inner * &scale;

        self.gamma.add_grad(&dgamma.into_dyn());
        self.beta.add_grad(&dbeta.into_dyn());
        dx
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.gamma, &mut self.beta]
    }

    pub fn params(&self) -> Vec<&Param> {
        vec![&self.gamma, &self.beta]
    }

    /// Running statistics, exposed for state serialization.
    pub fn running_stats(&self) -> (&Array1<f32>, &Array1<f32>) {
        (&self.running_mean, &self.running_var)
    }

    /// Replace running statistics, used when restoring serialized state.
    pub fn set_running_stats(&mut self, mean: Array1<f32>, var: Array1<f32>) {
        self.running_mean = mean;
        self.running_var = var;
    }

    /// Drop cached activations.
    pub fn release_scratch(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn train_output_is_standardized() {
        let mut bn = BatchNorm::new(2);
        let x = arr2(&[[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]]);
        let y = bn.forward_train(&x);

        for col in 0..2 {
            let column = y.column(col);
            let mean: f32 = column.iter().sum::<f32>() / 4.0;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn eval_uses_running_stats() {
        let mut bn = BatchNorm::new(1);
        let x = arr2(&[[5.0], [7.0]]);
        // Several passes move running stats toward the batch stats.
        for _ in 0..1000 {
            bn.forward_train(&x);
        }
        let y = bn.forward_eval(&arr2(&[[6.0]]));
        // 6.0 is the running mean, so the normalized output is near zero.
        assert_relative_eq!(y[[0, 0]], 0.0, epsilon = 0.05);
    }

    #[test]
    fn backward_gradient_matches_finite_difference() {
        let mut bn = BatchNorm::new(2);
        let x = arr2(&[[0.5, -1.0], [1.5, 0.3], [-0.7, 2.0]]);

        bn.forward_train(&x);
        let dy = Array2::ones((3, 2));
        bn.backward(&dy);
        let analytic = bn.gamma.grad[[0]];

        // d(sum(y))/d(gamma_0) = sum over batch of x_hat[:, 0].
        let eps = 1e-3;
        bn.gamma.value[[0]] = 1.0 + eps;
        let plus = bn.forward_train(&x).sum();
        bn.gamma.value[[0]] = 1.0 - eps;
        let minus = bn.forward_train(&x).sum();
        let numeric = (plus - minus) / (2.0 * eps);

        assert_relative_eq!(analytic, numeric, epsilon = 1e-2);
    }

    #[test]
    fn beta_shifts_output() {
        let mut bn = BatchNorm::new(1);
        bn.beta.value[[0]] = 3.0;
        let x = arr2(&[[1.0], [2.0]]);
        let y = bn.forward_train(&x);
        let mean: f32 = y.iter().sum::<f32>() / 2.0;
        assert_relative_eq!(mean, 3.0, epsilon = 1e-5);
    }
}
