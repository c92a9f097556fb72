//! Single-fold fit loop with callback orchestration.

use ndarray::{ArrayView1, ArrayView4};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::class_weight::ClassWeights;
use crate::error::Result;
use crate::model::{sigmoid, Model, ModelState};
use crate::optim::Optimizer;
use crate::train::batch::{gather_images, gather_labels};
use crate::train::callback::{CallbackAction, CallbackContext, CallbackSet};
use crate::train::history::{EpochRecord, History};
use crate::train::loss::{bce_mean, BinaryCrossEntropy};
use crate::train::metrics::{BinaryCounts, EvalReport};

/// Decision threshold used for accuracy, precision, and recall.
pub const CLASSIFICATION_THRESHOLD: f32 = 0.5;

/// Knobs of a single fit cycle.
#[derive(Clone, Copy, Debug)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// When false, the supplied class weights are ignored and the loss
    /// stays unweighted.
    pub apply_class_weights: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 30,
            batch_size: 32,
            apply_class_weights: true,
        }
    }
}

/// Owns the model, optimizer, and callback set for the lifetime of a
/// k-fold run. One trainer fine-tunes one model across every fold it is
/// handed; weights persist between [`Trainer::fit`] calls unless the
/// callback policy resets them.
pub struct Trainer {
    model: Model,
    optimizer: Box<dyn Optimizer>,
    callbacks: CallbackSet,
    config: FitConfig,
    rng: StdRng,
    best_snapshot: Option<ModelState>,
    fit_cycles: usize,
}

impl Trainer {
    /// `rng` drives batch shuffling and must come from a dedicated stream.
    pub fn new(
        model: Model,
        optimizer: Box<dyn Optimizer>,
        callbacks: CallbackSet,
        config: FitConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            model,
            optimizer,
            callbacks,
            config,
            rng,
            best_snapshot: None,
            fit_cycles: 0,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// Completed fit cycles, one per fold.
    pub fn fit_cycles(&self) -> usize {
        self.fit_cycles
    }

    /// Run one fit cycle over the given train and validation partitions.
    ///
    /// `class_weights` is the map computed once from the full training
    /// partition before fold iteration; it is applied as-is, never
    /// recomputed from the fold subset.
    ///
    /// Every epoch: apply the effective learning rate, shuffle, descend
    /// over mini-batches, validate in inference mode, then fire the
    /// callback pipeline. On early stop the weights with the best seen
    /// validation loss are restored before returning.
    pub fn fit(
        &mut self,
        x_train: ArrayView4<f32>,
        y_train: ArrayView1<f32>,
        x_val: ArrayView4<f32>,
        y_val: ArrayView1<f32>,
        class_weights: &ClassWeights,
    ) -> Result<History> {
        self.callbacks.begin_fold();

        let loss = if self.config.apply_class_weights {
            BinaryCrossEntropy::with_class_weights(class_weights.clone())
        } else {
            eprintln!("warning: class weights computed but not applied to the loss");
            BinaryCrossEntropy::new()
        };

        let n = y_train.len();
        let mut order: Vec<usize> = (0..n).collect();
        let mut history = History::new();

        for epoch in 0..self.config.epochs {
            let lr = self.callbacks.effective_lr(epoch);
            self.optimizer.set_lr(lr);

            order.shuffle(&mut self.rng);
            let mut loss_sum = 0.0;
            let mut counts = BinaryCounts::default();
            for batch in order.chunks(self.config.batch_size) {
                let xb = gather_images(x_train, batch);
                let yb = gather_labels(y_train, batch);

                self.model.zero_grads();
                let logits = self.model.forward_train(&xb);
                let (batch_loss, dlogits) = loss.forward(&logits, yb.view());
                self.model.backward(&dlogits);
                let mut params = self.model.trainable_params_mut();
                self.optimizer.step(&mut params);

                loss_sum += (batch_loss + self.model.l2_penalty()) * batch.len() as f32;
                counts.update(
                    logits.mapv(sigmoid).view(),
                    yb.view(),
                    CLASSIFICATION_THRESHOLD,
                );
            }
            let train_loss = loss_sum / n as f32;

            let val = self.evaluate_views(x_val, y_val);
            println!(
                "Epoch {}/{}: loss {:.4}, acc {:.4}, val_loss {:.4}, val_acc {:.4}, lr {:.6}",
                epoch + 1,
                self.config.epochs,
                train_loss,
                counts.accuracy(),
                val.loss,
                val.accuracy,
                lr
            );

            let ctx = CallbackContext {
                epoch,
                max_epochs: self.config.epochs,
                loss: train_loss,
                val_loss: val.loss,
                lr,
            };
            let outcome = self.callbacks.on_epoch_end(&self.model, &ctx);
            if outcome.improved {
                self.best_snapshot = Some(self.model.state());
            }

            history.push(EpochRecord {
                epoch,
                loss: train_loss,
                accuracy: counts.accuracy(),
                precision: counts.precision(),
                recall: counts.recall(),
                val_loss: val.loss,
                val_accuracy: val.accuracy,
                val_precision: val.precision,
                val_recall: val.recall,
                lr,
            });

            if outcome.action == CallbackAction::Stop {
                if let Some(best) = &self.best_snapshot {
                    self.model.load_state(best)?;
                    println!("Restoring model weights from the end of the best epoch");
                }
                history.stopped_early = true;
                break;
            }
        }

        self.fit_cycles += 1;
        Ok(history)
    }

    /// Inference-mode metrics over a partition, including the L2 penalty
    /// so the reported loss matches the trained objective.
    pub fn evaluate(&self, x: ArrayView4<f32>, y: ArrayView1<f32>) -> EvalReport {
        self.evaluate_views(x, y)
    }

    fn evaluate_views(&self, x: ArrayView4<f32>, y: ArrayView1<f32>) -> EvalReport {
        let n = y.len();
        let mut loss_sum = 0.0;
        let mut counts = BinaryCounts::default();
        let indices: Vec<usize> = (0..n).collect();
        for batch in indices.chunks(self.config.batch_size) {
            let xb = gather_images(x, batch);
            let yb = gather_labels(y, batch);
            let logits = self.model.forward_eval_logits(&xb);
            loss_sum += bce_mean(logits.view(), yb.view()) * batch.len() as f32;
            counts.update(
                logits.mapv(sigmoid).view(),
                yb.view(),
                CLASSIFICATION_THRESHOLD,
            );
        }
        EvalReport {
            loss: loss_sum / n as f32 + self.model.l2_penalty(),
            accuracy: counts.accuracy(),
            precision: counts.precision(),
            recall: counts.recall(),
        }
    }

    /// Drop cached activations at fold boundaries.
    pub fn end_fold(&mut self) {
        self.model.release_scratch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_weight::balanced_class_weights;
    use crate::model::{build_model, BackboneConfig};
    use crate::optim::Adam;
    use crate::rng::RngContext;
    use crate::train::callback::{CallbackSet, StatePolicy};
    use ndarray::{Array1, Array4};
    use tempfile::tempdir;

    fn toy_data(n: usize) -> (Array4<f32>, Array1<f32>) {
        // Positives are bright, negatives are dark; separable.
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f32);
        let x = Array4::from_shape_fn((n, 8, 8, 3), |(i, h, w, _)| {
            let base = if i % 2 == 0 { 0.1 } else { 0.9 };
            base + 0.01 * ((h * w) % 5) as f32
        });
        (x, y)
    }

    fn toy_trainer(dir: &std::path::Path, epochs: usize) -> Trainer {
        let ctx = RngContext::new(42);
        let model = build_model((8, 8, 3), 0.001, &BackboneConfig::small(), &ctx).unwrap();
        let callbacks =
            CallbackSet::new(dir.join("model.json"), epochs).with_policy(StatePolicy::Carry);
        Trainer::new(
            model,
            Box::new(Adam::default_params(1e-3)),
            callbacks,
            FitConfig {
                epochs,
                batch_size: 8,
                apply_class_weights: true,
            },
            ctx.batch_stream(),
        )
    }

    #[test]
    fn fit_records_one_epoch_per_iteration() {
        let dir = tempdir().unwrap();
        let mut trainer = toy_trainer(dir.path(), 3);
        let (x, y) = toy_data(24);
        let cw = balanced_class_weights(y.view()).unwrap();
        let history = trainer
            .fit(x.view(), y.view(), x.view(), y.view(), &cw)
            .unwrap();
        assert_eq!(history.len(), 3);
        assert!(!history.stopped_early);
        assert_eq!(trainer.fit_cycles(), 1);
    }

    #[test]
    fn fit_reduces_training_loss_on_separable_data() {
        let dir = tempdir().unwrap();
        let mut trainer = toy_trainer(dir.path(), 8);
        let (x, y) = toy_data(32);
        let cw = balanced_class_weights(y.view()).unwrap();
        let history = trainer
            .fit(x.view(), y.view(), x.view(), y.view(), &cw)
            .unwrap();
        let first = history.records.first().unwrap().loss;
        let last = history.records.last().unwrap().loss;
        assert!(last < first, "loss did not decrease: {first} -> {last}");
    }

    #[test]
    fn checkpoint_file_appears_after_improvement() {
        let dir = tempdir().unwrap();
        let mut trainer = toy_trainer(dir.path(), 2);
        let (x, y) = toy_data(16);
        let cw = balanced_class_weights(y.view()).unwrap();
        trainer
            .fit(x.view(), y.view(), x.view(), y.view(), &cw)
            .unwrap();
        assert!(dir.path().join("model.json").exists());
    }

    #[test]
    fn evaluate_reports_finite_metrics() {
        let dir = tempdir().unwrap();
        let mut trainer = toy_trainer(dir.path(), 1);
        let (x, y) = toy_data(16);
        let cw = balanced_class_weights(y.view()).unwrap();
        trainer
            .fit(x.view(), y.view(), x.view(), y.view(), &cw)
            .unwrap();
        let report = trainer.evaluate(x.view(), y.view());
        assert!(report.loss.is_finite());
        assert!((0.0..=1.0).contains(&report.accuracy));
        assert!((0.0..=1.0).contains(&report.precision));
        assert!((0.0..=1.0).contains(&report.recall));
    }

    #[test]
    fn fit_never_recomputes_weights_from_the_fold_subset() {
        // A single-class train subset would abort if the trainer derived
        // weights from it; with the full-set map supplied it trains fine.
        let dir = tempdir().unwrap();
        let mut trainer = toy_trainer(dir.path(), 1);
        let (x_full, y_full) = toy_data(16);
        let cw = balanced_class_weights(y_full.view()).unwrap();

        let y_single = Array1::from_elem(16, 1.0f32);
        let history = trainer
            .fit(x_full.view(), y_single.view(), x_full.view(), y_full.view(), &cw)
            .unwrap();
        assert_eq!(history.len(), 1);
    }
}
