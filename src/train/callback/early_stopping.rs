//! Early stopping on validation-loss stagnation.

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Stops training when validation loss has not improved for more than
/// `patience` consecutive epochs.
///
/// State is `{best, wait}`; both reset only at construction or via
/// [`TrainerCallback::reset`], so a carried instance keeps its best-seen
/// value across fold boundaries. The trainer snapshots model weights on
/// every improvement and restores them when this callback signals stop.
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    best: f32,
    wait: usize,
}

impl EarlyStopping {
    /// Create with the given patience; stop fires when the
    /// non-improvement streak exceeds it.
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            min_delta: 0.0,
            best: f32::INFINITY,
            wait: 0,
        }
    }

    /// Require at least `min_delta` of improvement to reset the streak.
    pub fn with_min_delta(mut self, min_delta: f32) -> Self {
        self.min_delta = min_delta;
        self
    }

    /// Best validation loss seen so far.
    pub fn best(&self) -> f32 {
        self.best
    }

    /// True when the most recent observation improved on best-seen.
    pub fn improved(&self) -> bool {
        self.wait == 0
    }

    fn observe(&mut self, val_loss: f32) {
        if val_loss < self.best - self.min_delta {
            self.best = val_loss;
            self.wait = 0;
        } else {
            self.wait += 1;
        }
    }
}

impl TrainerCallback for EarlyStopping {
    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.observe(ctx.val_loss);
        if self.wait > self.patience {
            eprintln!(
                "Early stopping: no improvement for {} epochs (best val_loss: {:.4})",
                self.wait, self.best
            );
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }

    fn reset(&mut self) {
        self.best = f32::INFINITY;
        self.wait = 0;
    }

    fn name(&self) -> &'static str {
        "EarlyStopping"
    }
}
