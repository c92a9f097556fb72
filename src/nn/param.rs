//! Trainable parameter: a value tensor paired with its gradient buffer.

use ndarray::{ArrayD, ArrayView1, ArrayView2, Ix1, Ix2};

/// A parameter tensor and its accumulated gradient.
///
/// Gradients accumulate across backward calls until the optimizer zeroes
/// them; the trainer zeroes before every batch.
#[derive(Clone, Debug)]
pub struct Param {
    pub value: ArrayD<f32>,
    pub grad: ArrayD<f32>,
}

impl Param {
    /// Wrap a value tensor with a zeroed gradient of the same shape.
    pub fn new(value: ArrayD<f32>) -> Self {
        let grad = ArrayD::zeros(value.raw_dim());
        Self { value, grad }
    }

    /// View the value as a matrix. Panics if the parameter is not 2-D.
    pub fn view2(&self) -> ArrayView2<f32> {
        self.value.view().into_dimensionality::<Ix2>().expect("2-D parameter")
    }

    /// View the value as a vector. Panics if the parameter is not 1-D.
    pub fn view1(&self) -> ArrayView1<f32> {
        self.value.view().into_dimensionality::<Ix1>().expect("1-D parameter")
    }

    /// Accumulate a gradient contribution.
    pub fn add_grad(&mut self, g: &ArrayD<f32>) {
        self.grad += g;
    }

    /// Reset the gradient buffer to zero.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// True when the parameter holds no elements.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
