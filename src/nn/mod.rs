//! Layer primitives with explicit forward/backward passes.
//!
//! Every layer caches what its backward pass needs during `forward_train`
//! and exposes an inference-mode `forward_eval` that caches nothing. Shapes
//! follow the channels-last convention: images are `(batch, h, w, c)`,
//! features are `(batch, features)`.

mod batch_norm;
mod conv;
mod dense;
mod dropout;
mod param;
mod pool;

pub use batch_norm::BatchNorm;
pub use conv::PointwiseConv;
pub use dense::{Activation, Dense};
pub use dropout::Dropout;
pub use param::Param;
pub use pool::{avg_pool2, avg_pool2_backward, GlobalAvgPool};
