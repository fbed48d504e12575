//! Error types for inferbench-core

use thiserror::Error;

use crate::traits::CodecError;

/// Core error type
///
/// Only setup problems surface through this type. Failures of individual
/// requests are absorbed into the aggregate counters and never reach the
/// caller of [`crate::BenchmarkDriver::run`].
#[derive(Error, Debug)]
pub enum BenchError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A required builder field was not provided
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// The example source could not produce an example
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Codec construction or usage error outside the request path
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        BenchError::Config(message.into())
    }

    /// Create a missing-configuration error for a builder field
    pub fn missing_config(field: &'static str) -> Self {
        BenchError::MissingConfig(field)
    }

    /// Create a dataset error
    pub fn dataset(message: impl Into<String>) -> Self {
        BenchError::Dataset(message.into())
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_message() {
        let err = BenchError::missing_config("codec");
        assert_eq!(err.to_string(), "missing required configuration: codec");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BenchError = io.into();
        assert!(matches!(err, BenchError::Io(_)));
    }
}
