//! Classification head appended to the backbone.
//!
//! Pooled features flow through three regularized blocks down to a single
//! logit: BN -> Dropout(0.3) -> Dense(512, ReLU, L2) -> BN -> Dropout(0.3)
//! -> Dense(256, ReLU, L2) -> BN -> Dropout(0.3) -> Dense(1). The sigmoid
//! is applied at the model boundary so the loss can work on logits.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::nn::{Activation, BatchNorm, Dense, Dropout, Param};

const DROPOUT_RATE: f32 = 0.3;

pub struct Head {
    bn_in: BatchNorm,
    drop_in: Dropout,
    fc1: Dense,
    bn1: BatchNorm,
    drop1: Dropout,
    fc2: Dense,
    bn2: BatchNorm,
    drop2: Dropout,
    out: Dense,
}

impl Head {
    /// Build the head over `in_features` pooled channels. Weights draw
    /// from `init_rng`; dropout masks seed from the separate
    /// `dropout_rng`, so mask sequences do not shift when weight-init
    /// consumption changes.
    pub fn new(
        in_features: usize,
        l2_reg: f32,
        init_rng: &mut StdRng,
        dropout_rng: &mut StdRng,
    ) -> Self {
        let child = |rng: &mut StdRng| StdRng::seed_from_u64(rng.gen());
        Self {
            bn_in: BatchNorm::new(in_features),
            drop_in: Dropout::new(DROPOUT_RATE, child(dropout_rng)),
            fc1: Dense::new(in_features, 512, Activation::Relu, l2_reg, init_rng),
            bn1: BatchNorm::new(512),
            drop1: Dropout::new(DROPOUT_RATE, child(dropout_rng)),
            fc2: Dense::new(512, 256, Activation::Relu, l2_reg, init_rng),
            bn2: BatchNorm::new(256),
            drop2: Dropout::new(DROPOUT_RATE, child(dropout_rng)),
            out: Dense::new(256, 1, Activation::Linear, 0.0, init_rng),
        }
    }

    /// Forward in training mode; output is one logit per sample.
    pub fn forward_train(&mut self, x: &Array2<f32>) -> Array2<f32> {
        let x = self.bn_in.forward_train(x);
        let x = self.drop_in.forward_train(&x);
        let x = self.fc1.forward_train(&x);
        let x = self.bn1.forward_train(&x);
        let x = self.drop1.forward_train(&x);
        let x = self.fc2.forward_train(&x);
        let x = self.bn2.forward_train(&x);
        let x = self.drop2.forward_train(&x);
        self.out.forward_train(&x)
    }

    /// Forward in inference mode.
    pub fn forward_eval(&self, x: &Array2<f32>) -> Array2<f32> {
        let x = self.bn_in.forward_eval(x);
        let x = self.drop_in.forward_eval(&x);
        let x = self.fc1.forward_eval(&x);
        let x = self.bn1.forward_eval(&x);
        let x = self.drop1.forward_eval(&x);
        let x = self.fc2.forward_eval(&x);
        let x = self.bn2.forward_eval(&x);
        let x = self.drop2.forward_eval(&x);
        self.out.forward_eval(&x)
    }

    /// Backward through the full block stack; returns the gradient with
    /// respect to the pooled features.
    pub fn backward(&mut self, dlogits: &Array2<f32>) -> Array2<f32> {
        let g = self.out.backward(dlogits);
        let g = self.drop2.backward(&g);
        let g = self.bn2.backward(&g);
        let g = self.fc2.backward(&g);
        let g = self.drop1.backward(&g);
        let g = self.bn1.backward(&g);
        let g = self.fc1.backward(&g);
        let g = self.drop_in.backward(&g);
        self.bn_in.backward(&g)
    }

    /// L2 penalty contributed by the regularized dense kernels.
    pub fn l2_penalty(&self) -> f32 {
        self.fc1.l2_penalty() + self.fc2.l2_penalty() + self.out.l2_penalty()
    }

    /// All head parameters are trainable.
    pub fn trainable_params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = Vec::new();
        params.extend(self.bn_in.params_mut());
        params.extend(self.fc1.params_mut());
        params.extend(self.bn1.params_mut());
        params.extend(self.fc2.params_mut());
        params.extend(self.bn2.params_mut());
        params.extend(self.out.params_mut());
        params
    }

    /// Parameters in traversal order, for serialization.
    pub fn all_params(&self) -> Vec<&Param> {
        let mut params = Vec::new();
        params.extend(self.bn_in.params());
        params.extend(self.fc1.params());
        params.extend(self.bn1.params());
        params.extend(self.fc2.params());
        params.extend(self.bn2.params());
        params.extend(self.out.params());
        params
    }

    /// Mutable parameters in traversal order, for state restore.
    pub fn all_params_mut(&mut self) -> Vec<&mut Param> {
        self.trainable_params_mut()
    }

    /// Batch-norm layers in traversal order, for running-stat
    /// serialization.
    pub fn batch_norms(&self) -> [&BatchNorm; 3] {
        [&self.bn_in, &self.bn1, &self.bn2]
    }

    pub fn batch_norms_mut(&mut self) -> [&mut BatchNorm; 3] {
        [&mut self.bn_in, &mut self.bn1, &mut self.bn2]
    }

    /// Drop cached activations and masks.
    pub fn release_scratch(&mut self) {
        self.bn_in.release_scratch();
        self.drop_in.release_scratch();
        self.fc1.release_scratch();
        self.bn1.release_scratch();
        self.drop1.release_scratch();
        self.fc2.release_scratch();
        self.bn2.release_scratch();
        self.drop2.release_scratch();
        self.out.release_scratch();
    }
}
