//! Learning-rate reduction on validation-loss plateau.

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Multiplies the learning rate by `factor` when validation loss
/// stagnates for `patience` epochs.
///
/// This callback never writes the optimizer's learning rate itself; it
/// exposes an accumulated [`scale`](Self::scale) that the callback set
/// folds into the effective learning rate, so the cosine schedule and the
/// plateau reduction combine deterministically instead of racing.
#[derive(Clone, Debug)]
pub struct ReduceLrOnPlateau {
    patience: usize,
    factor: f32,
    min_lr: f32,
    best: f32,
    wait: usize,
    scale: f32,
}

impl ReduceLrOnPlateau {
    pub fn new(patience: usize, factor: f32, min_lr: f32) -> Self {
        assert!(factor > 0.0 && factor < 1.0, "reduction factor must be in (0, 1)");
        Self {
            patience,
            factor,
            min_lr,
            best: f32::INFINITY,
            wait: 0,
            scale: 1.0,
        }
    }

    /// Accumulated reduction applied on top of the scheduled rate.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Floor below which the effective learning rate never drops.
    pub fn min_lr(&self) -> f32 {
        self.min_lr
    }
}

impl TrainerCallback for ReduceLrOnPlateau {
    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if ctx.val_loss < self.best {
            self.best = ctx.val_loss;
            self.wait = 0;
        } else {
            self.wait += 1;
            if self.wait >= self.patience {
                self.scale *= self.factor;
                self.wait = 0;
                println!(
                    "ReduceLrOnPlateau: val_loss stagnant for {} epochs, LR scale now {:.2e}",
                    self.patience, self.scale
                );
            }
        }
        CallbackAction::Continue
    }

    fn reset(&mut self) {
        self.best = f32::INFINITY;
        self.wait = 0;
        self.scale = 1.0;
    }

    fn name(&self) -> &'static str {
        "ReduceLrOnPlateau"
    }
}
