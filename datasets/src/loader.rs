//! Validation set loading

use std::path::Path;
use std::time::Instant;

use inferbench_core::Example;

use crate::dataset::Dataset;
use crate::error::DatasetResult;
use crate::manifest::{read_manifest, MANIFEST_FILE};
use crate::preprocess::Preprocessor;

/// Load the first `num_images` manifest entries of `data_dir` into a dataset
///
/// Every image is decoded and preprocessed up front so the benchmark loop
/// only measures the remote calls.
pub fn load_validation_set(
    data_dir: &Path,
    num_images: usize,
    preprocessor: &Preprocessor,
) -> DatasetResult<Dataset> {
    let start = Instant::now();
    let entries = read_manifest(&data_dir.join(MANIFEST_FILE), num_images)?;

    let examples = entries
        .iter()
        .map(|entry| -> DatasetResult<Example> {
            let input = preprocessor.load(&entry.image_path(data_dir))?;
            Ok(Example::new(entry.file_name.clone(), input, entry.label))
        })
        .collect::<DatasetResult<Vec<_>>>()?;

    tracing::info!(
        data_dir = %data_dir.display(),
        images = examples.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded validation set"
    );

    Ok(Dataset::new(data_dir.display().to_string(), examples))
}
