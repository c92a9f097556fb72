//! Best-model checkpointing.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::Model;

/// Persists the full model state to a fixed path whenever validation loss
/// improves on this instance's best-seen value.
///
/// Best-seen spans the instance's lifetime, so a carried checkpointer
/// keeps comparing against the best loss of earlier folds. The file is
/// overwritten in place; only the single best model survives a run.
#[derive(Clone, Debug)]
pub struct Checkpointer {
    path: PathBuf,
    best: f32,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            best: f32::INFINITY,
        }
    }

    /// Conventional checkpoint path for a dataset version and epoch bound.
    pub fn model_path(image_number: usize, image_size: usize, epochs: usize) -> PathBuf {
        PathBuf::from("models/densenet_kfold").join(format!(
            "densenet_model_kfold-{image_number}-{image_size}-{epochs}.json"
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best validation loss that produced a checkpoint so far.
    pub fn best(&self) -> f32 {
        self.best
    }

    /// Save the model when `val_loss` improves on best-seen. Returns
    /// whether a checkpoint was written. IO failures bubble up as
    /// [`crate::error::Error::CheckpointWrite`]; the caller logs them and
    /// keeps training.
    pub fn save_if_improved(&mut self, model: &Model, val_loss: f32) -> Result<bool> {
        if val_loss >= self.best {
            return Ok(false);
        }
        self.best = val_loss;
        model.state().save(&self.path)?;
        println!(
            "Checkpoint: val_loss improved to {:.4}, model saved to {}",
            val_loss,
            self.path.display()
        );
        Ok(true)
    }

    /// Forget the best-seen value (fresh-per-fold policy).
    pub fn reset(&mut self) {
        self.best = f32::INFINITY;
    }
}
