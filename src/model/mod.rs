//! Classifier model: pretrained backbone, global pooling, dense head.

mod backbone;
mod head;
mod state;

pub use backbone::{Backbone, BackboneConfig};
pub use head::Head;
pub use state::ModelState;

use ndarray::{Array1, Array2, Array4};

use crate::error::{Error, Result};
use crate::nn::{GlobalAvgPool, Param};
use crate::rng::RngContext;

/// The full binary classifier.
///
/// One mutable instance of this persists across folds during k-fold
/// orchestration; `predict` is pure with respect to model state.
pub struct Model {
    backbone: Backbone,
    gap: GlobalAvgPool,
    head: Head,
    input_shape: (usize, usize, usize),
}

/// Number of trailing backbone layers unfrozen for fine-tuning.
pub const UNFREEZE_LAYERS: usize = 30;

/// Build the compiled classifier.
///
/// Backbone weights come from the configured pretrained file when it
/// exists on disk, otherwise from the seeded init stream. The backbone
/// arrives frozen; exactly the last [`UNFREEZE_LAYERS`] layers are
/// unfrozen by position (degrading to unfreeze-all when the backbone is
/// shallower), and the head is appended fully trainable. `input_shape` is
/// `(height, width, channels)`.
pub fn build_model(
    input_shape: (usize, usize, usize),
    l2_reg: f32,
    config: &BackboneConfig,
    ctx: &RngContext,
) -> Result<Model> {
    let mut init_rng = ctx.init_stream();
    let mut backbone = match &config.weights {
        Some(path) if path.exists() => {
            Backbone::pretrained(config, input_shape.2, path, &mut init_rng)?
        }
        _ => Backbone::new(config, input_shape.2, &mut init_rng),
    };
    backbone.unfreeze_last(UNFREEZE_LAYERS);
    let head = Head::new(
        backbone.out_channels(),
        l2_reg,
        &mut init_rng,
        &mut ctx.dropout_stream(),
    );
    Ok(Model {
        backbone,
        gap: GlobalAvgPool::new(),
        head,
        input_shape,
    })
}

impl Model {
    /// Expected `(height, width, channels)` of input batches.
    pub fn input_shape(&self) -> (usize, usize, usize) {
        self.input_shape
    }

    /// Opaque view of the feature extractor.
    pub fn backbone(&self) -> &Backbone {
        &self.backbone
    }

    fn check_input(&self, x: &Array4<f32>) {
        let (_, h, w, c) = x.dim();
        assert_eq!(
            (h, w, c),
            self.input_shape,
            "input batch shape does not match the model's expected input shape"
        );
    }

    /// Training-mode forward pass; returns one logit per sample and caches
    /// activations for [`Model::backward`].
    pub fn forward_train(&mut self, x: &Array4<f32>) -> Array1<f32> {
        self.check_input(x);
        let features = self.backbone.forward_train(x);
        let pooled = self.gap.forward_train(&features);
        let logits = self.head.forward_train(&pooled);
        logits.column(0).to_owned()
    }

    /// Inference-mode forward pass on raw logits. Pure with respect to
    /// model state; validation loss is computed on these for stability.
    pub fn forward_eval_logits(&self, x: &Array4<f32>) -> Array1<f32> {
        self.check_input(x);
        let features = self.backbone.forward_eval(x);
        let pooled = self.gap.forward_eval(&features);
        let logits = self.head.forward_eval(&pooled);
        logits.column(0).to_owned()
    }

    /// Inference-mode forward pass; returns a probability in `[0, 1]` per
    /// sample. Pure with respect to model state.
    pub fn predict(&self, x: &Array4<f32>) -> Array1<f32> {
        self.forward_eval_logits(x).mapv(sigmoid)
    }

    /// Backpropagate a per-sample logit gradient through head, pooling,
    /// and the unfrozen part of the backbone.
    pub fn backward(&mut self, dlogits: &Array1<f32>) {
        let dlogits2: Array2<f32> = dlogits
            .view()
            .insert_axis(ndarray::Axis(1))
            .to_owned();
        let dpooled = self.head.backward(&dlogits2);
        let dfeatures = self.gap.backward(&dpooled);
        self.backbone.backward(&dfeatures);
    }

    /// L2 penalty the regularized kernels contribute to the loss.
    pub fn l2_penalty(&self) -> f32 {
        self.head.l2_penalty()
    }

    /// Parameters the optimizer updates: unfrozen backbone layers plus the
    /// full head, in a stable order.
    pub fn trainable_params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.backbone.trainable_params_mut();
        params.extend(self.head.trainable_params_mut());
        params
    }

    /// Zero every trainable gradient buffer.
    pub fn zero_grads(&mut self) {
        for p in self.trainable_params_mut() {
            p.zero_grad();
        }
    }

    /// Snapshot the complete model state: all parameters (frozen included)
    /// plus batch-norm running statistics.
    pub fn state(&self) -> ModelState {
        let mut tensors: Vec<_> = self
            .backbone
            .all_params()
            .into_iter()
            .chain(self.head.all_params())
            .map(|p| p.value.clone())
            .collect();
        for bn in self.head.batch_norms() {
            let (mean, var) = bn.running_stats();
            tensors.push(mean.clone().into_dyn());
            tensors.push(var.clone().into_dyn());
        }
        ModelState { tensors }
    }

    /// Restore a snapshot taken from an identically configured model.
    pub fn load_state(&mut self, state: &ModelState) -> Result<()> {
        let n_params = self.backbone.all_params().len() + self.head.all_params().len();
        let expected = n_params + self.head.batch_norms().len() * 2;
        if state.tensors.len() != expected {
            return Err(Error::StateMismatch {
                expected,
                actual: state.tensors.len(),
            });
        }

        let mut params = self.backbone.all_params_mut();
        params.extend(self.head.all_params_mut());
        for (param, tensor) in params.iter_mut().zip(&state.tensors) {
            if param.value.shape() != tensor.shape() {
                return Err(Error::Serialization(format!(
                    "state tensor shape {:?} does not match parameter shape {:?}",
                    tensor.shape(),
                    param.value.shape()
                )));
            }
            param.value.assign(tensor);
        }

        let mut rest = state.tensors[n_params..].iter();
        for bn in self.head.batch_norms_mut() {
            let mean = rest.next().expect("length checked above");
            let var = rest.next().expect("length checked above");
            bn.set_running_stats(
                mean.clone().into_dimensionality().map_err(|e| {
                    Error::Serialization(format!("running mean dimensionality: {e}"))
                })?,
                var.clone().into_dimensionality().map_err(|e| {
                    Error::Serialization(format!("running var dimensionality: {e}"))
                })?,
            );
        }
        Ok(())
    }

    /// Release cached activations and masks. Called between folds so held
    /// scratch buffers do not accumulate over a long multi-fold run.
    pub fn release_scratch(&mut self) {
        self.backbone.release_scratch();
        self.gap.release_scratch();
        self.head.release_scratch();
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
