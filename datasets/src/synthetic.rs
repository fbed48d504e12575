//! Random input tensors

use inferbench_core::Tensor;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::DatasetResult;

/// Tensor of `shape` with every value drawn from `Normal(mean, std_dev)`
pub fn normal_tensor<R: Rng + ?Sized>(
    shape: Vec<usize>,
    mean: f32,
    std_dev: f32,
    rng: &mut R,
) -> DatasetResult<Tensor> {
    let normal = Normal::new(mean, std_dev)?;
    let len = shape.iter().product();
    let data = normal.sample_iter(rng).take(len).collect();
    Ok(Tensor::new(shape, data)?)
}
