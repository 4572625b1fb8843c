pub mod ckpt;
pub mod container;
mod error;
mod weights;

pub use error::CastError;
pub use weights::{Dtype, Tensor, WeightMap};
