//! Error types with actionable diagnostics.
//!
//! All errors carry enough context to resolve the problem without digging
//! through the source. This is a batch offline job: every failure except a
//! checkpoint write aborts the run, and rerunning after fixing data or
//! config is the only recovery path.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for afinar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading data, building the model, or training.
#[derive(Error, Debug)]
pub enum Error {
    /// A required input array file is absent.
    #[error("data file not found: {path}\n  → Run the preprocessing stage, or check IMAGE_NUMBER/IMAGE_SIZE against the processed_data directory name")]
    DataNotFound { path: PathBuf },

    /// An input array file exists but could not be parsed.
    #[error("failed to read array {path}: {source}")]
    ArrayRead {
        path: PathBuf,
        source: ndarray_npy::ReadNpyError,
    },

    /// Feature and label counts disagree within one partition.
    #[error("shape mismatch in {partition} partition: {features} feature rows vs {labels} labels\n  → The on-disk arrays are misaligned; regenerate the processed dataset")]
    ShapeMismatch {
        partition: &'static str,
        features: usize,
        labels: usize,
    },

    /// Class weighting is undefined with fewer than two classes.
    #[error("degenerate labels: {found} distinct class(es) present, need at least 2\n  → Balanced class weights are undefined for a single-class label set")]
    DegenerateLabels { found: usize },

    /// Persisting the model failed. Logged at the call site; training
    /// continues without that checkpoint.
    #[error("failed to write checkpoint {path}: {source}")]
    CheckpointWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A serialized model state does not match the model it is loaded into.
    #[error("model state mismatch: expected {expected} tensors, got {actual}\n  → The checkpoint was produced by a differently-configured model")]
    StateMismatch { expected: usize, actual: usize },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error without a more specific variant.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when training may proceed after logging this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::CheckpointWrite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_write_is_recoverable() {
        let err = Error::CheckpointWrite {
            path: PathBuf::from("/tmp/model.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn data_errors_are_fatal() {
        let err = Error::DataNotFound {
            path: PathBuf::from("processed_data/X_train.npy"),
        };
        assert!(!err.is_recoverable());

        let err = Error::DegenerateLabels { found: 1 };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn messages_carry_actionable_hints() {
        let err = Error::ShapeMismatch {
            partition: "train",
            features: 100,
            labels: 99,
        };
        let msg = err.to_string();
        assert!(msg.contains("train"));
        assert!(msg.contains("100"));
        assert!(msg.contains("regenerate"));
    }
}
