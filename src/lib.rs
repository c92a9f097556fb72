//! # afinar
//!
//! Fine-tuning pipeline for a binary image classifier: a pretrained
//! convolutional backbone with its last layers unfrozen, a regularized
//! dense head, and a training loop driven by early stopping, plateau
//! learning-rate reduction, a cosine annealing schedule, and best-weight
//! checkpointing, evaluated under stratified k-fold cross-validation.
//!
//! ## Quick example
//!
//! ```no_run
//! use afinar::class_weight::balanced_class_weights;
//! use afinar::model::{build_model, BackboneConfig};
//! use afinar::optim::Adam;
//! use afinar::rng::RngContext;
//! use afinar::train::{CallbackSet, FitConfig, KFoldRunner, Trainer};
//! use ndarray::{Array1, Array4};
//!
//! let ctx = RngContext::new(42);
//! let model = build_model((32, 32, 3), 0.001, &BackboneConfig::small(), &ctx).unwrap();
//! let mut trainer = Trainer::new(
//!     model,
//!     Box::new(Adam::default_params(1e-4)),
//!     CallbackSet::new("models/model.json", 30),
//!     FitConfig::default(),
//!     ctx.batch_stream(),
//! );
//!
//! let x = Array4::<f32>::zeros((100, 32, 32, 3));
//! let y = Array1::from_shape_fn(100, |i| (i % 2) as f32);
//! let weights = balanced_class_weights(y.view()).unwrap();
//! let histories = KFoldRunner::new(5)
//!     .run(&mut trainer, x.view(), y.view(), &weights, &mut ctx.fold_stream())
//!     .unwrap();
//! assert_eq!(histories.len(), 5);
//! ```

pub mod class_weight;
pub mod data;
pub mod error;
pub mod model;
pub mod nn;
pub mod optim;
pub mod rng;
pub mod split;
pub mod train;

pub use class_weight::{balanced_class_weights, ClassWeights};
pub use data::Dataset;
pub use error::{Error, Result};
pub use model::{build_model, BackboneConfig, Model, ModelState};
pub use optim::{Adam, Optimizer};
pub use rng::RngContext;
pub use split::StratifiedKFold;
pub use train::{
    CallbackSet, EvalReport, FitConfig, History, KFoldRunner, StatePolicy, Trainer,
};
