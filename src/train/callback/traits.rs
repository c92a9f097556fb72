//! Core types for the per-epoch callback pipeline.

/// Read-only training state passed to callbacks at each epoch boundary.
#[derive(Clone, Copy, Debug)]
pub struct CallbackContext {
    /// Current epoch (0-indexed).
    pub epoch: usize,
    /// Epoch bound for this fit cycle.
    pub max_epochs: usize,
    /// Mean training loss for the epoch, regularization included.
    pub loss: f32,
    /// Mean validation loss for the epoch.
    pub val_loss: f32,
    /// Learning rate that was in effect this epoch.
    pub lr: f32,
}

/// Action a callback can request after an epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally.
    Continue,
    /// Stop training after the current epoch.
    Stop,
}

/// Trait for epoch-boundary training callbacks.
pub trait TrainerCallback {
    /// Called after each epoch, once validation metrics are known.
    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Reset internal state machines, used at fold boundaries when the
    /// fresh-per-fold policy is active.
    fn reset(&mut self) {}

    /// Callback name for logging.
    fn name(&self) -> &'static str;
}
