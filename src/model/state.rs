//! Serializable snapshot of full model state.

use std::path::Path;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Every tensor a model needs to be restored: trainable and frozen
/// parameters plus batch-norm running statistics, in a fixed traversal
/// order. Serialized as JSON for checkpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelState {
    pub tensors: Vec<ArrayD<f32>>,
}

impl ModelState {
    /// Write the state as JSON, creating parent directories as needed.
    ///
    /// Failures map to [`Error::CheckpointWrite`] so callers can treat
    /// them as non-fatal.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::CheckpointWrite {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string(self)
            .map_err(|e| Error::Serialization(format!("model state: {e}")))?;
        std::fs::write(path, json).map_err(|source| Error::CheckpointWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a state previously written by [`ModelState::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DataNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = std::fs::File::open(path)?;
        serde_json::from_reader(file).map_err(|e| Error::Serialization(format!("model state: {e}")))
    }
}
