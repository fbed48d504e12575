//! Example and in-flight request types

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::traits::CodecError;

/// Dense `f32` tensor in row-major order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor, checking that `data` fills `shape` exactly
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, CodecError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(CodecError::ShapeMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Tensor of the given shape filled with zeros
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; len],
        }
    }

    /// Shape of the tensor
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flat row-major data
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Split into shape and flat data
    pub fn into_parts(self) -> (Vec<usize>, Vec<f32>) {
        (self.shape, self.data)
    }

    /// Same data viewed under a new shape with the same element count
    pub fn reshape(&self, shape: Vec<usize>) -> Result<Tensor, CodecError> {
        Tensor::new(shape, self.data.clone())
    }

    /// Nested JSON arrays following the tensor's shape
    pub fn to_nested_json(&self) -> serde_json::Value {
        fn nest(shape: &[usize], data: &[f32]) -> serde_json::Value {
            match shape.split_first() {
                None => data
                    .first()
                    .map(|v| serde_json::Value::from(f64::from(*v)))
                    .unwrap_or(serde_json::Value::Null),
                Some((&dim, rest)) => {
                    let stride: usize = rest.iter().product();
                    let items = (0..dim)
                        .map(|i| nest(rest, &data[i * stride..(i + 1) * stride]))
                        .collect();
                    serde_json::Value::Array(items)
                }
            }
        }
        nest(&self.shape, &self.data)
    }
}

/// One labelled input drawn from the example source
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Identifier, typically the image file name
    pub id: String,
    /// Model input
    pub input: Tensor,
    /// Ground-truth class index
    pub expected_label: usize,
}

impl Example {
    /// Create a new example
    pub fn new(id: impl Into<String>, input: Tensor, expected_label: usize) -> Self {
        Self {
            id: id.into(),
            input,
            expected_label,
        }
    }
}

/// Context captured when a request is dispatched
///
/// Moved into the completion path so the outcome can be resolved without
/// touching any state owned by the control thread.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Dispatch index within the run (0-based)
    pub index: usize,
    /// Identifier of the example sent
    pub example_id: String,
    /// Label the prediction is compared against
    pub expected_label: usize,
    /// When the request was handed to the transport
    pub dispatched_at: Instant,
}

impl PendingRequest {
    /// Capture the dispatch context for `example`
    pub fn new(index: usize, example: &Example) -> Self {
        Self {
            index,
            example_id: example.id.clone(),
            expected_label: example.expected_label,
            dispatched_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape_mismatch() {
        let err = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, CodecError::ShapeMismatch { len: 3, .. }));
    }

    #[test]
    fn test_tensor_zeros() {
        let t = Tensor::zeros(vec![2, 3]);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.data().len(), 6);
    }

    #[test]
    fn test_tensor_nested_json() {
        let t = Tensor::new(vec![1, 2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let json = t.to_nested_json();
        assert_eq!(json, serde_json::json!([[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]]));
    }

    #[test]
    fn test_tensor_reshape() {
        let t = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let r = t.reshape(vec![1, 2, 2]).unwrap();
        assert_eq!(r.shape(), &[1, 2, 2]);
        assert!(t.reshape(vec![3]).is_err());

        let (shape, data) = r.into_parts();
        assert_eq!(shape, vec![1, 2, 2]);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_pending_request_captures_label() {
        let example = Example::new("ILSVRC2012_val_00000001.JPEG", Tensor::zeros(vec![1]), 65);
        let pending = PendingRequest::new(3, &example);
        assert_eq!(pending.index, 3);
        assert_eq!(pending.example_id, "ILSVRC2012_val_00000001.JPEG");
        assert_eq!(pending.expected_label, 65);
    }
}
