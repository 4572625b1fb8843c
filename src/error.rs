use thiserror::Error;

/// Errors raised while casting weight files between formats.
///
/// No recovery happens anywhere; every variant propagates to `main` and
/// terminates the process.
#[derive(Error, Debug)]
pub enum CastError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint: {0}")]
    Pickle(#[from] serde_pickle::Error),

    #[error("container: {0}")]
    SafeTensors(#[from] safetensors::SafeTensorError),

    #[error("checkpoint top level is not a mapping of tensors")]
    NotAMapping,

    #[error("checkpoint key is not a string")]
    KeyNotAString,

    #[error("malformed tensor record for `{0}`")]
    MalformedRecord(String),

    #[error("unsupported dtype `{0}`")]
    UnsupportedDtype(String),

    #[error("tensor data is {actual} bytes, dtype and shape want {expected}")]
    DataLen { expected: usize, actual: usize },
}
