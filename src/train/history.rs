//! Per-fold training history.

/// Scalar metrics recorded at the end of one epoch.
#[derive(Clone, Copy, Debug)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub val_loss: f32,
    pub val_accuracy: f32,
    pub val_precision: f32,
    pub val_recall: f32,
    pub lr: f32,
}

/// One fit cycle's epoch-by-epoch record. Created at the start of each
/// fold's fit call; the orchestrator returns all fold histories and the
/// caller decides what to retain.
#[derive(Clone, Debug, Default)]
pub struct History {
    pub records: Vec<EpochRecord>,
    pub stopped_early: bool,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    /// Number of completed epochs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lowest validation loss seen in this fit cycle.
    pub fn best_val_loss(&self) -> Option<f32> {
        self.records
            .iter()
            .map(|r| r.val_loss)
            .min_by(|a, b| a.partial_cmp(b).expect("val loss is not NaN"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: usize, val_loss: f32) -> EpochRecord {
        EpochRecord {
            epoch,
            loss: 1.0,
            accuracy: 0.5,
            precision: 0.5,
            recall: 0.5,
            val_loss,
            val_accuracy: 0.5,
            val_precision: 0.5,
            val_recall: 0.5,
            lr: 1e-4,
        }
    }

    #[test]
    fn best_val_loss_tracks_minimum() {
        let mut history = History::new();
        assert!(history.best_val_loss().is_none());

        history.push(record(0, 0.9));
        history.push(record(1, 0.4));
        history.push(record(2, 0.6));
        assert_eq!(history.best_val_loss(), Some(0.4));
        assert_eq!(history.len(), 3);
        assert!(!history.stopped_early);
    }
}
