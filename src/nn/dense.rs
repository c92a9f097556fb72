//! Fully-connected layer with optional ReLU and L2 kernel regularization.

use ndarray::{Array1, Array2, ArrayD, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use super::param::Param;

/// Activation applied after the affine transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Relu,
}

/// Dense layer: `y = act(x · W + b)`.
///
/// The L2 coefficient contributes `l2 * Σ w²` to the training loss and
/// `2 * l2 * W` to the weight gradient, matching the usual kernel-regularizer
/// semantics. Biases are not regularized.
pub struct Dense {
    weight: Param,
    bias: Param,
    activation: Activation,
    l2: f32,
    cached_input: Option<Array2<f32>>,
    cached_preact: Option<Array2<f32>>,
}

impl Dense {
    /// Create a dense layer with He-uniform initialized weights.
    pub fn new(
        in_features: usize,
        out_features: usize,
        activation: Activation,
        l2: f32,
        rng: &mut StdRng,
    ) -> Self {
        let limit = (6.0 / in_features as f32).sqrt();
        let weight = ArrayD::from_shape_fn(ndarray::IxDyn(&[in_features, out_features]), |_| {
            rng.gen_range(-limit..limit)
        });
        let bias = ArrayD::zeros(ndarray::IxDyn(&[out_features]));
        Self {
            weight: Param::new(weight),
            bias: Param::new(bias),
            activation,
            l2,
            cached_input: None,
            cached_preact: None,
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.value.shape()[0]
    }

    pub fn out_features(&self) -> usize {
        self.weight.value.shape()[1]
    }

    /// Forward pass in training mode; caches activations for backward.
    pub fn forward_train(&mut self, x: &Array2<f32>) -> Array2<f32> {
        let z = x.dot(&self.weight.view2()) + &self.bias.view1();
        let y = self.apply_activation(&z);
        self.cached_input = Some(x.clone());
        self.cached_preact = Some(z);
        y
    }

    /// Forward pass in inference mode; no caching.
    pub fn forward_eval(&self, x: &Array2<f32>) -> Array2<f32> {
        let z = x.dot(&self.weight.view2()) + &self.bias.view1();
        self.apply_activation(&z)
    }

    fn apply_activation(&self, z: &Array2<f32>) -> Array2<f32> {
        match self.activation {
            Activation::Linear => z.clone(),
            Activation::Relu => z.mapv(|v| v.max(0.0)),
        }
    }

    /// Backward pass: accumulates weight/bias gradients and returns the
    /// gradient with respect to the layer input.
    ///
    /// # Panics
    ///
    /// Panics if called without a preceding `forward_train`.
    pub fn backward(&mut self, dy: &Array2<f32>) -> Array2<f32> {
        let x = self.cached_input.as_ref().expect("backward before forward_train");
        let z = self.cached_preact.as_ref().expect("backward before forward_train");

        let dz = match self.activation {
            Activation::Linear => dy.clone(),
            Activation::Relu => dy * &z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
        };

        let mut dw = x.t().dot(&dz);
        if self.l2 > 0.0 {
            let reg = self.weight.view2().to_owned() * (2.0 * self.l2);
            dw += &reg;
        }
        let db = dz.sum_axis(Axis(0));

        self.weight.add_grad(&dw.into_dyn());
        self.bias.add_grad(&db.into_dyn());

        dz.dot(&self.weight.view2().t())
    }

    /// L2 penalty this layer contributes to the loss.
    pub fn l2_penalty(&self) -> f32 {
        if self.l2 == 0.0 {
            return 0.0;
        }
        self.l2 * self.weight.value.iter().map(|w| w * w).sum::<f32>()
    }

    /// Mutable access to the layer parameters, weights first.
    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weight, &mut self.bias]
    }

    /// Shared access to the layer parameters, weights first.
    pub fn params(&self) -> Vec<&Param> {
        vec![&self.weight, &self.bias]
    }

    /// Drop cached activations.
    pub fn release_scratch(&mut self) {
        self.cached_input = None;
        self.cached_preact = None;
    }
}
