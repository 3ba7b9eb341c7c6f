use thiserror::Error;

/// Errors surfaced by the training pipelines.
#[derive(Error, Debug)]
pub enum Error {
    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem access failed (sample directory, config file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Loading or saving a burn record failed.
    #[error("record error: {0}")]
    Record(#[from] burn::record::RecorderError),

    /// Invalid configuration (unknown layer name, empty layer list, bad size).
    #[error("config error: {0}")]
    Config(String),

    /// Tensor data could not be converted to host values.
    #[error("tensor data error: {0}")]
    Tensor(String),
}

pub type Result<T> = std::result::Result<T, Error>;
