//! Pointwise (1x1) convolution over channels-last feature maps.
//!
//! A 1x1 convolution is a dense transform applied independently at every
//! spatial position, so forward and backward are exact matrix products over
//! the flattened spatial grid. The backbone is built from these.

use ndarray::{Array2, Array4, ArrayD, Axis, IxDyn};
use rand::rngs::StdRng;
use rand::Rng;

use super::param::Param;

/// 1x1 convolution with ReLU, freezable for fine-tuning.
#[derive(Debug)]
pub struct PointwiseConv {
    weight: Param, // (c_in, c_out)
    bias: Param,   // (c_out,)
    trainable: bool,
    cached_input: Option<Array4<f32>>,
    cached_preact: Option<Array4<f32>>,
}

impl PointwiseConv {
    /// Create a frozen layer with He-uniform initialized weights.
    pub fn new(in_channels: usize, out_channels: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / in_channels as f32).sqrt();
        let weight = ArrayD::from_shape_fn(IxDyn(&[in_channels, out_channels]), |_| {
            rng.gen_range(-limit..limit)
        });
        let bias = ArrayD::zeros(IxDyn(&[out_channels]));
        Self {
            weight: Param::new(weight),
            bias: Param::new(bias),
            trainable: false,
            cached_input: None,
            cached_preact: None,
        }
    }

    pub fn in_channels(&self) -> usize {
        self.weight.value.shape()[0]
    }

    pub fn out_channels(&self) -> usize {
        self.weight.value.shape()[1]
    }

    pub fn trainable(&self) -> bool {
        self.trainable
    }

    pub fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    fn affine(&self, x: &Array4<f32>) -> Array4<f32> {
        let (b, h, w, cin) = x.dim();
        let cout = self.out_channels();
        let x2 = flatten_spatial(x, b * h * w, cin);
        let z2 = x2.dot(&self.weight.view2()) + &self.bias.view1();
        z2.into_shape_with_order((b, h, w, cout)).expect("conv output reshape")
    }

    /// Forward in training mode; caches input and pre-activation.
    pub fn forward_train(&mut self, x: &Array4<f32>) -> Array4<f32> {
        let z = self.affine(x);
        let y = z.mapv(|v| v.max(0.0));
        self.cached_input = Some(x.clone());
        self.cached_preact = Some(z);
        y
    }

    /// Forward in inference mode; no caching.
    pub fn forward_eval(&self, x: &Array4<f32>) -> Array4<f32> {
        self.affine(x).mapv(|v| v.max(0.0))
    }

    /// Backward pass. Gradients accumulate only when the layer is
    /// trainable; the input gradient is always computed so earlier
    /// trainable layers still receive signal.
    pub fn backward(&mut self, dy: &Array4<f32>) -> Array4<f32> {
        let x = self.cached_input.as_ref().expect("backward before forward_train");
        let z = self.cached_preact.as_ref().expect("backward before forward_train");
        let (b, h, w, cin) = x.dim();
        let cout = self.out_channels();

        let mask = z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let dz = dy * &mask;
        let dz2 = flatten_spatial(&dz, b * h * w, cout);

        if self.trainable {
            let x2 = flatten_spatial(x, b * h * w, cin);
            let dw = x2.t().dot(&dz2);
            let db = dz2.sum_axis(Axis(0));
            self.weight.add_grad(&dw.into_dyn());
            self.bias.add_grad(&db.into_dyn());
        }

        let dx2 = dz2.dot(&self.weight.view2().t());
        dx2.into_shape_with_order((b, h, w, cin)).expect("conv input reshape")
    }

    /// Mutable parameters, weights first. Empty when frozen: frozen layers
    /// are invisible to the optimizer.
    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        if self.trainable {
            vec![&mut self.weight, &mut self.bias]
        } else {
            Vec::new()
        }
    }

    /// All parameters regardless of trainability, for serialization.
    pub fn all_params(&self) -> Vec<&Param> {
        vec![&self.weight, &self.bias]
    }

    /// Mutable access to all parameters, for state restore.
    pub fn all_params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weight, &mut self.bias]
    }

    /// Drop cached activations.
    pub fn release_scratch(&mut self) {
        self.cached_input = None;
        self.cached_preact = None;
    }
}

fn flatten_spatial(x: &Array4<f32>, rows: usize, cols: usize) -> Array2<f32> {
    x.to_shape((rows, cols)).expect("contiguous feature map").into_owned()
}
