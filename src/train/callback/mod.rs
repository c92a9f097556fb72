//! Training controls fired at epoch boundaries.

mod checkpoint;
mod early_stopping;
mod reduce_lr;
mod schedule;
mod set;
mod traits;

pub use checkpoint::Checkpointer;
pub use early_stopping::EarlyStopping;
pub use reduce_lr::ReduceLrOnPlateau;
pub use schedule::CosineAnnealingSchedule;
pub use set::{
    CallbackSet, EpochOutcome, StatePolicy, EARLY_STOP_PATIENCE, ETA_MAX, MIN_LR,
    REDUCE_LR_FACTOR, REDUCE_LR_PATIENCE,
};
pub use traits::{CallbackAction, CallbackContext, TrainerCallback};
