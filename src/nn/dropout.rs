//! Inverted dropout.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;

/// Dropout with inverted scaling: surviving activations are scaled by
/// `1 / (1 - rate)` so inference needs no rescaling. Inference mode is the
/// identity.
pub struct Dropout {
    rate: f32,
    rng: StdRng,
    mask: Option<Array2<f32>>,
}

impl Dropout {
    /// Create a dropout layer. `rate` is the drop probability in `[0, 1)`.
    pub fn new(rate: f32, rng: StdRng) -> Self {
        assert!((0.0..1.0).contains(&rate), "dropout rate must be in [0, 1)");
        Self {
            rate,
            rng,
            mask: None,
        }
    }

    /// Sample a fresh mask and apply it.
    pub fn forward_train(&mut self, x: &Array2<f32>) -> Array2<f32> {
        if self.rate == 0.0 {
            self.mask = None;
            return x.clone();
        }
        let keep = 1.0 - self.rate;
        let scale = 1.0 / keep;
        let mask = Array2::from_shape_fn(x.raw_dim(), |_| {
            if self.rng.gen::<f32>() < keep {
                scale
            } else {
                0.0
            }
        });
        let y = x * &mask;
        self.mask = Some(mask);
        y
    }

    /// Identity in inference mode.
    pub fn forward_eval(&self, x: &Array2<f32>) -> Array2<f32> {
        x.clone()
    }

    /// Propagate gradients through the last sampled mask.
    pub fn backward(&mut self, dy: &Array2<f32>) -> Array2<f32> {
        match &self.mask {
            Some(mask) => dy * mask,
            None => dy.clone(),
        }
    }

    /// Drop the cached mask.
    pub fn release_scratch(&mut self) {
        self.mask = None;
    }
}
