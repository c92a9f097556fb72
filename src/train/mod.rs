//! Fit loop, losses, metrics, and fold orchestration.

pub mod batch;
pub mod callback;
pub mod history;
pub mod kfold;
pub mod loss;
pub mod metrics;
pub mod trainer;

pub use callback::{
    CallbackAction, CallbackContext, CallbackSet, Checkpointer, CosineAnnealingSchedule,
    EarlyStopping, EpochOutcome, ReduceLrOnPlateau, StatePolicy, TrainerCallback,
};
pub use history::{EpochRecord, History};
pub use kfold::KFoldRunner;
pub use loss::{bce_mean, BinaryCrossEntropy};
pub use metrics::{BinaryCounts, EvalReport};
pub use trainer::{FitConfig, Trainer, CLASSIFICATION_THRESHOLD};
