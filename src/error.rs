use thiserror::Error;

use crate::parameters::{BoundsError, ParameterError, SerializationError};

/// Error types for the minopt-rs library.
#[derive(Error, Debug)]
pub enum MinOptError {
    /// A quantity that only exists after a fit was requested before any fit ran.
    #[error("Must have done a fit before calling {0}()")]
    NoFitPerformed(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(#[from] ParameterError),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<BoundsError> for MinOptError {
    fn from(err: BoundsError) -> Self {
        MinOptError::ParameterError(ParameterError::from(err))
    }
}

impl From<SerializationError> for MinOptError {
    fn from(err: SerializationError) -> Self {
        match err {
            SerializationError::IoError(e) => MinOptError::IoError(e),
            SerializationError::JsonError(e) => MinOptError::JsonError(e),
        }
    }
}

/// Result type alias for minopt-rs operations.
pub type Result<T> = std::result::Result<T, MinOptError>;
