//! Stratified k-fold orchestration over a single shared trainer.

use ndarray::{ArrayView1, ArrayView4};
use rand::rngs::StdRng;

use crate::class_weight::ClassWeights;
use crate::error::Result;
use crate::split::StratifiedKFold;
use crate::train::batch::{gather_images, gather_labels};
use crate::train::history::History;
use crate::train::trainer::Trainer;

/// Runs one fit cycle per fold. The trainer's model is shared across
/// folds, so later folds continue fine-tuning the weights earlier folds
/// produced.
pub struct KFoldRunner {
    splitter: StratifiedKFold,
}

impl KFoldRunner {
    pub fn new(n_splits: usize) -> Self {
        Self {
            splitter: StratifiedKFold::new(n_splits),
        }
    }

    pub fn n_splits(&self) -> usize {
        self.splitter.n_splits()
    }

    /// Split `(x, y)` into stratified folds and fit each in order,
    /// returning one history per fold. `rng` must come from the fold
    /// stream so the partition is reproducible. `class_weights` is the
    /// map computed once from the full training partition; every fold
    /// trains with the same map.
    pub fn run(
        &self,
        trainer: &mut Trainer,
        x: ArrayView4<f32>,
        y: ArrayView1<f32>,
        class_weights: &ClassWeights,
        rng: &mut StdRng,
    ) -> Result<Vec<History>> {
        let folds = self.splitter.split(y, rng);
        let mut histories = Vec::with_capacity(folds.len());
        for (i, (train_idx, val_idx)) in folds.iter().enumerate() {
            println!(
                "Fold {}/{}: {} train, {} val",
                i + 1,
                folds.len(),
                train_idx.len(),
                val_idx.len()
            );
            let x_train = gather_images(x, train_idx);
            let y_train = gather_labels(y, train_idx);
            let x_val = gather_images(x, val_idx);
            let y_val = gather_labels(y, val_idx);

            let history = trainer.fit(
                x_train.view(),
                y_train.view(),
                x_val.view(),
                y_val.view(),
                class_weights,
            )?;
            trainer.end_fold();
            histories.push(history);
        }
        Ok(histories)
    }
}
