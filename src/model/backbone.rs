//! Pretrained convolutional feature extractor.
//!
//! The backbone is a positionally ordered stack of pointwise-conv layers
//! with periodic 2x2 average pooling. Everywhere else in the crate it is
//! opaque: the trainer only sees `forward`/`backward`, a layer count, and
//! per-position trainable flags. Weights come from a pretrained file when
//! one is available, otherwise from the seeded init stream.

use std::path::{Path, PathBuf};

use ndarray::Array4;
use rand::rngs::StdRng;

use crate::error::{Error, Result};
use crate::nn::{avg_pool2, avg_pool2_backward, Param, PointwiseConv};

use super::state::ModelState;

/// Backbone architecture description.
#[derive(Clone, Debug)]
pub struct BackboneConfig {
    /// Output channels of each conv layer, in order. The length is the
    /// backbone's layer count.
    pub widths: Vec<usize>,
    /// Insert a 2x2 average pool after every this many layers.
    pub pool_every: usize,
    /// Optional pretrained weight file. When set and present on disk, the
    /// backbone loads it; otherwise weights come from the seeded init
    /// stream.
    pub weights: Option<PathBuf>,
}

impl Default for BackboneConfig {
    /// 36 layers in three 12-layer stages of growing width, pooling
    /// between stages.
    fn default() -> Self {
        let mut widths = vec![32; 12];
        widths.extend(std::iter::repeat(64).take(12));
        widths.extend(std::iter::repeat(128).take(12));
        Self {
            widths,
            pool_every: 12,
            weights: None,
        }
    }
}

impl BackboneConfig {
    /// A small backbone for tests and smoke runs.
    pub fn small() -> Self {
        Self {
            widths: vec![8, 8, 16, 16],
            pool_every: 2,
            weights: None,
        }
    }

    /// Load pretrained backbone weights from `path` when the file exists.
    pub fn with_weights(mut self, path: impl Into<PathBuf>) -> Self {
        self.weights = Some(path.into());
        self
    }
}

/// The feature-extraction portion of the model.
#[derive(Debug)]
pub struct Backbone {
    layers: Vec<PointwiseConv>,
    pool_every: usize,
    // Pre-pool spatial dims per pool site, recorded during forward_train.
    pooled_at: Vec<Option<(usize, usize)>>,
}

impl Backbone {
    /// Build a backbone with seeded random weights. `in_channels` is the
    /// image channel count (3 for RGB).
    pub fn new(config: &BackboneConfig, in_channels: usize, rng: &mut StdRng) -> Self {
        let mut layers = Vec::with_capacity(config.widths.len());
        let mut cin = in_channels;
        for &cout in &config.widths {
            layers.push(PointwiseConv::new(cin, cout, rng));
            cin = cout;
        }
        Self {
            layers,
            pool_every: config.pool_every,
            pooled_at: Vec::new(),
        }
    }

    /// Build a backbone and load pretrained weights from `path`.
    pub fn pretrained(
        config: &BackboneConfig,
        in_channels: usize,
        path: impl AsRef<Path>,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let mut backbone = Self::new(config, in_channels, rng);
        let file = std::fs::File::open(path.as_ref()).map_err(|_| Error::DataNotFound {
            path: path.as_ref().to_path_buf(),
        })?;
        let state: ModelState = serde_json::from_reader(file)
            .map_err(|e| Error::Serialization(format!("pretrained backbone: {e}")))?;
        backbone.load_state(&state)?;
        Ok(backbone)
    }

    /// Number of positionally ordered layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Channel count of the final feature map.
    pub fn out_channels(&self) -> usize {
        self.layers.last().map_or(0, PointwiseConv::out_channels)
    }

    /// Unfreeze the last `n` layers by position. When the backbone has
    /// fewer than `n` layers this degrades to unfreezing all of them.
    pub fn unfreeze_last(&mut self, n: usize) {
        let total = self.layers.len();
        let start = total.saturating_sub(n);
        for layer in &mut self.layers[start..] {
            layer.set_trainable(true);
        }
    }

    /// Count of currently trainable layers.
    pub fn num_trainable(&self) -> usize {
        self.layers.iter().filter(|l| l.trainable()).count()
    }

    fn wants_pool(&self, index: usize, h: usize, w: usize) -> bool {
        (index + 1) % self.pool_every == 0 && h % 2 == 0 && w % 2 == 0 && h > 1 && w > 1
    }

    /// Forward in training mode.
    pub fn forward_train(&mut self, x: &Array4<f32>) -> Array4<f32> {
        self.pooled_at = vec![None; self.layers.len()];
        let mut out = x.clone();
        for i in 0..self.layers.len() {
            out = self.layers[i].forward_train(&out);
            let (_, h, w, _) = out.dim();
            if self.wants_pool(i, h, w) {
                self.pooled_at[i] = Some((h, w));
                out = avg_pool2(&out);
            }
        }
        out
    }

    /// Forward in inference mode.
    pub fn forward_eval(&self, x: &Array4<f32>) -> Array4<f32> {
        let mut out = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            out = layer.forward_eval(&out);
            let (_, h, w, _) = out.dim();
            if self.wants_pool(i, h, w) {
                out = avg_pool2(&out);
            }
        }
        out
    }

    /// Backward through every layer, mirroring the forward pool sites.
    pub fn backward(&mut self, dy: &Array4<f32>) {
        let mut grad = dy.clone();
        for i in (0..self.layers.len()).rev() {
            if self.pooled_at[i].is_some() {
                grad = avg_pool2_backward(&grad);
            }
            grad = self.layers[i].backward(&grad);
        }
    }

    /// Parameters of the unfrozen layers only.
    pub fn trainable_params_mut(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut().flat_map(PointwiseConv::params_mut).collect()
    }

    /// Every parameter, frozen included, in positional order.
    pub fn all_params(&self) -> Vec<&Param> {
        self.layers.iter().flat_map(PointwiseConv::all_params).collect()
    }

    /// Mutable access to every parameter, for state restore.
    pub fn all_params_mut(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut().flat_map(PointwiseConv::all_params_mut).collect()
    }

    fn load_state(&mut self, state: &ModelState) -> Result<()> {
        let mut params = self.all_params_mut();
        if state.tensors.len() != params.len() {
            return Err(Error::StateMismatch {
                expected: params.len(),
                actual: state.tensors.len(),
            });
        }
        for (param, tensor) in params.iter_mut().zip(&state.tensors) {
            if param.value.shape() != tensor.shape() {
                return Err(Error::Serialization(format!(
                    "backbone tensor shape {:?} does not match {:?}",
                    tensor.shape(),
                    param.value.shape()
                )));
            }
            param.value.assign(tensor);
        }
        Ok(())
    }

    /// Drop cached activations.
    pub fn release_scratch(&mut self) {
        for layer in &mut self.layers {
            layer.release_scratch();
        }
        self.pooled_at.clear();
    }
}
