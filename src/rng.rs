//! Explicit RNG context threaded through every stochastic component.
//!
//! One integer seed fans out into independent named streams (fold shuffling,
//! weight initialization, dropout masks, batch ordering). No process-global
//! RNG state exists anywhere in the crate, so two runs with the same seed
//! produce identical fold assignments and initial weights, and tests can run
//! in parallel without interfering.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic source for all randomness in a training run.
#[derive(Clone, Copy, Debug)]
pub struct RngContext {
    seed: u64,
}

// Distinct salts keep the streams statistically independent.
const SALT_FOLDS: u64 = 0x5354_5241_5446_4f4c; // fold shuffling
const SALT_INIT: u64 = 0x494e_4954_5f57_4754; // weight init
const SALT_DROPOUT: u64 = 0x4452_4f50_4f55_5421; // dropout masks
const SALT_BATCHES: u64 = 0x4241_5443_485f_4f52; // batch ordering

/// SplitMix64 finalizer; decorrelates nearby seeds before they reach StdRng.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

impl RngContext {
    /// Create a context from a single integer seed.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The seed this context was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn stream(&self, salt: u64) -> StdRng {
        StdRng::seed_from_u64(splitmix64(self.seed ^ salt))
    }

    /// RNG stream for the stratified fold splitter.
    pub fn fold_stream(&self) -> StdRng {
        self.stream(SALT_FOLDS)
    }

    /// RNG stream for weight initialization.
    pub fn init_stream(&self) -> StdRng {
        self.stream(SALT_INIT)
    }

    /// RNG stream for dropout masks.
    pub fn dropout_stream(&self) -> StdRng {
        self.stream(SALT_DROPOUT)
    }

    /// RNG stream for per-epoch batch shuffling.
    pub fn batch_stream(&self) -> StdRng {
        self.stream(SALT_BATCHES)
    }
}
