//! Error types for dataset loading

use std::path::PathBuf;

use inferbench_core::{BenchError, CodecError};
use thiserror::Error;

/// Dataset loading errors
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Manifest produced no entries
    #[error("manifest {0} has no entries")]
    EmptyManifest(PathBuf),

    /// Manifest line could not be parsed
    #[error("manifest line {line}: {reason}")]
    Manifest {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Image could not be opened or decoded
    #[error("failed to load image {path}: {source}")]
    Image {
        /// Image path
        path: PathBuf,
        /// Underlying decode error
        #[source]
        source: image::ImageError,
    },

    /// Pixel data did not fill the output tensor
    #[error("tensor error: {0}")]
    Tensor(#[from] CodecError),

    /// Invalid sampling distribution parameters
    #[error("invalid distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

impl From<DatasetError> for BenchError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Io(e) => BenchError::Io(e),
            other => BenchError::dataset(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_error_message() {
        let err = DatasetError::Manifest {
            line: 3,
            reason: "missing label".into(),
        };
        assert_eq!(err.to_string(), "manifest line 3: missing label");
    }

    #[test]
    fn test_into_bench_error() {
        let err: BenchError = DatasetError::EmptyManifest(PathBuf::from("/data/validation_label.txt")).into();
        assert!(matches!(err, BenchError::Dataset(_)));

        let err: BenchError = DatasetError::from(CodecError::EmptyScores).into();
        assert!(matches!(err, BenchError::Dataset(_)));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BenchError = DatasetError::Io(io).into();
        assert!(matches!(err, BenchError::Io(_)));
    }
}
