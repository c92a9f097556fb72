//! The fixed callback set attached to every fit invocation.

use super::checkpoint::Checkpointer;
use super::early_stopping::EarlyStopping;
use super::reduce_lr::ReduceLrOnPlateau;
use super::schedule::CosineAnnealingSchedule;
use super::traits::{CallbackAction, CallbackContext, TrainerCallback};
use crate::model::Model;

use std::path::PathBuf;

/// What happens to callback state machines at fold boundaries.
///
/// `Carry` preserves best-seen values and counters across folds, matching
/// continual fine-tuning of a single shared model. `FreshPerFold` resets
/// every callback at the start of each fold for independent fit cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatePolicy {
    Carry,
    FreshPerFold,
}

/// Result of firing the callback set at an epoch boundary.
#[derive(Clone, Copy, Debug)]
pub struct EpochOutcome {
    pub action: CallbackAction,
    /// Validation loss improved on the early stopper's best-seen; the
    /// trainer snapshots weights when this is set.
    pub improved: bool,
}

/// The four training controls, fired in a fixed order every epoch:
/// early stopping, plateau reduction, checkpointing. The cosine schedule
/// holds no epoch-end state; it participates through
/// [`effective_lr`](Self::effective_lr), which the trainer applies once at
/// the start of each epoch. Combining the schedule and the plateau scale
/// into one pure function removes the last-writer-wins race two
/// independent LR mutators would have.
pub struct CallbackSet {
    pub early_stopping: EarlyStopping,
    pub reduce_lr: ReduceLrOnPlateau,
    pub checkpoint: Checkpointer,
    pub schedule: CosineAnnealingSchedule,
    policy: StatePolicy,
}

/// Early-stopping patience on validation loss.
pub const EARLY_STOP_PATIENCE: usize = 10;
/// Plateau patience before a reduction.
pub const REDUCE_LR_PATIENCE: usize = 5;
/// Multiplicative plateau reduction factor.
pub const REDUCE_LR_FACTOR: f32 = 0.3;
/// Learning-rate floor.
pub const MIN_LR: f32 = 1e-6;
/// Cosine schedule ceiling.
pub const ETA_MAX: f32 = 1e-3;

impl CallbackSet {
    /// The reference configuration over a `max_epochs` horizon.
    pub fn new(checkpoint_path: impl Into<PathBuf>, max_epochs: usize) -> Self {
        Self {
            early_stopping: EarlyStopping::new(EARLY_STOP_PATIENCE),
            reduce_lr: ReduceLrOnPlateau::new(REDUCE_LR_PATIENCE, REDUCE_LR_FACTOR, MIN_LR),
            checkpoint: Checkpointer::new(checkpoint_path),
            schedule: CosineAnnealingSchedule::new(MIN_LR, ETA_MAX, max_epochs),
            policy: StatePolicy::Carry,
        }
    }

    /// Choose what happens to callback state at fold boundaries.
    pub fn with_policy(mut self, policy: StatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> StatePolicy {
        self.policy
    }

    /// Apply the fold-boundary policy. Called by the trainer at the start
    /// of every fit cycle.
    pub fn begin_fold(&mut self) {
        if self.policy == StatePolicy::FreshPerFold {
            self.early_stopping.reset();
            self.reduce_lr.reset();
            self.checkpoint.reset();
        }
    }

    /// Effective learning rate for an epoch: the cosine-scheduled rate
    /// scaled by accumulated plateau reductions, floored at the minimum.
    pub fn effective_lr(&self, epoch: usize) -> f32 {
        (self.schedule.lr_at(epoch) * self.reduce_lr.scale()).max(self.reduce_lr.min_lr())
    }

    /// Fire the epoch-end pipeline in its fixed order.
    pub fn on_epoch_end(&mut self, model: &Model, ctx: &CallbackContext) -> EpochOutcome {
        let action = self.early_stopping.on_epoch_end(ctx);
        let improved = self.early_stopping.improved();
        self.reduce_lr.on_epoch_end(ctx);
        if let Err(err) = self.checkpoint.save_if_improved(model, ctx.val_loss) {
            // Checkpoint failures never abort training.
            eprintln!("warning: {err}");
        }
        EpochOutcome { action, improved }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn effective_lr_starts_at_eta_max() {
        let set = CallbackSet::new("/tmp/model.json", 30);
        assert_relative_eq!(set.effective_lr(0), ETA_MAX, epsilon = 1e-9);
    }

    #[test]
    fn effective_lr_combines_schedule_and_plateau_scale() {
        let mut set = CallbackSet::new("/tmp/model.json", 30);
        let ctx = CallbackContext {
            epoch: 0,
            max_epochs: 30,
            loss: 1.0,
            val_loss: 1.0,
            lr: 1e-4,
        };
        // Stagnate long enough to trigger one reduction.
        for _ in 0..=REDUCE_LR_PATIENCE {
            set.reduce_lr.on_epoch_end(&ctx);
        }
        let expected = set.schedule.lr_at(3) * REDUCE_LR_FACTOR;
        assert_relative_eq!(set.effective_lr(3), expected, epsilon = 1e-9);
    }

    #[test]
    fn effective_lr_is_floored() {
        let mut set = CallbackSet::new("/tmp/model.json", 30);
        let ctx = CallbackContext {
            epoch: 0,
            max_epochs: 30,
            loss: 1.0,
            val_loss: 1.0,
            lr: 1e-4,
        };
        // Enough reductions to push any scheduled rate below the floor.
        for _ in 0..20 * (REDUCE_LR_PATIENCE + 1) {
            set.reduce_lr.on_epoch_end(&ctx);
        }
        assert_relative_eq!(set.effective_lr(29), MIN_LR, epsilon = 1e-12);
    }

    #[test]
    fn carry_policy_keeps_state_across_folds() {
        let mut set = CallbackSet::new("/tmp/model.json", 30);
        let ctx = CallbackContext {
            epoch: 0,
            max_epochs: 30,
            loss: 0.4,
            val_loss: 0.4,
            lr: 1e-4,
        };
        set.early_stopping.on_epoch_end(&ctx);
        set.begin_fold();
        assert_eq!(set.early_stopping.best(), 0.4);
    }

    #[test]
    fn fresh_policy_resets_state_at_fold_start() {
        let mut set =
            CallbackSet::new("/tmp/model.json", 30).with_policy(StatePolicy::FreshPerFold);
        let ctx = CallbackContext {
            epoch: 0,
            max_epochs: 30,
            loss: 0.4,
            val_loss: 0.4,
            lr: 1e-4,
        };
        set.early_stopping.on_epoch_end(&ctx);
        set.begin_fold();
        assert_eq!(set.early_stopping.best(), f32::INFINITY);
        assert_relative_eq!(set.reduce_lr.scale(), 1.0);
    }
}
