use thiserror::Error;

/// Failures raised by the numerical core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CardioError {
    /// Model parameters that cannot produce a usable grid or wave set.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation needs data the receiver does not carry.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// No wave with the given name exists in the model.
    #[error("unknown wave: {0}")]
    UnknownWave(String),

    /// An argument is outside the domain of the operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CardioError>;
