//! Gradient-based optimization.

mod adam;

pub use adam::Adam;

use crate::nn::Param;

/// Trait for optimization algorithms.
pub trait Optimizer {
    /// Apply one update step to the given parameters. The parameter slice
    /// must have a stable order across calls; moment buffers are keyed by
    /// position.
    fn step(&mut self, params: &mut [&mut Param]);

    /// Zero out all parameter gradients.
    fn zero_grad(&mut self, params: &mut [&mut Param]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate.
    fn lr(&self) -> f32;

    /// Set learning rate.
    fn set_lr(&mut self, lr: f32);
}
