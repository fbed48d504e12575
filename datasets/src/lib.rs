//! Example sources for inferbench
//!
//! - [`manifest`]: the `validation_label.txt` reader
//! - [`preprocess`]: image decode, resize and normalization into a tensor
//! - [`Dataset`]: in-memory examples served with epoch wraparound
//! - [`load_validation_set`]: manifest + images into a ready [`Dataset`]
//! - [`synthetic`]: random normal tensors for load scripts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dataset;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod preprocess;
pub mod synthetic;

pub use dataset::Dataset;
pub use error::{DatasetError, DatasetResult};
pub use loader::load_validation_set;
pub use manifest::{read_manifest, ManifestEntry, MANIFEST_FILE};
pub use preprocess::Preprocessor;
