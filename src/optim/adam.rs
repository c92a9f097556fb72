//! Adam optimizer.

use ndarray::ArrayD;

use super::Optimizer;
use crate::nn::Param;

/// Adam with bias-corrected first and second moment estimates.
///
/// Update: `θ_t = θ_{t-1} - lr * m̂_t / (√v̂_t + ε)`.
///
/// Moment buffers are keyed by parameter position and persist across fit
/// calls, so optimizer state is carried across folds along with the model.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Option<ArrayD<f32>>>,
    v: Vec<Option<ArrayD<f32>>>,
}

impl Adam {
    /// Create a new Adam optimizer.
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Adam with the usual defaults for everything but the learning rate.
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    /// Optimizer step counter.
    pub fn step_count(&self) -> u64 {
        self.t
    }

    fn ensure_moments(&mut self, n: usize) {
        if self.m.len() < n {
            self.m.resize(n, None);
            self.v.resize(n, None);
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Param]) {
        self.ensure_moments(params.len());
        self.t += 1;
        let t = self.t as f32;
        let (beta1, beta2) = (self.beta1, self.beta2);
        let bias1 = 1.0 - beta1.powf(t);
        let bias2 = 1.0 - beta2.powf(t);

        for (i, param) in params.iter_mut().enumerate() {
            let grad = &param.grad;
            let m = self.m[i].get_or_insert_with(|| ArrayD::zeros(grad.raw_dim()));
            let v = self.v[i].get_or_insert_with(|| ArrayD::zeros(grad.raw_dim()));

            m.zip_mut_with(grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            v.zip_mut_with(grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

            let lr = self.lr;
            let eps = self.epsilon;
            ndarray::Zip::from(&mut param.value)
                .and(&*m)
                .and(&*v)
                .for_each(|p, &m, &v| {
                    let m_hat = m / bias1;
                    let v_hat = v / bias2;
                    *p -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
