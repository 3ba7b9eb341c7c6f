pub mod data;
pub mod error;
pub mod model;
pub mod optim;
pub mod training;
pub mod transfer;
pub mod utils;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) type TestBackend = burn::backend::NdArray<f32>;
#[cfg(test)]
pub(crate) type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;
