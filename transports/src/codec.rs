//! JSON predict codecs for TF-Serving and KFServing
//!
//! Both protocols POST `{"instances": [...]}` to the REST predict endpoint;
//! TF-Serving additionally names the signature. Responses come back either
//! in row format (`predictions`) or columnar format (`outputs`), and each
//! prediction is a bare score list or an object carrying `scores`.

use inferbench_core::{CodecError, Example, Protocol, RequestCodec};
use serde_json::{json, Value};

/// Signature exported by the inception_v3 serving model
pub const DEFAULT_SIGNATURE: &str = "predict_images";

/// Per-example input shape (height, width, channels)
pub const DEFAULT_INPUT_SHAPE: [usize; 3] = [299, 299, 3];

/// Request codec for the REST predict API
#[derive(Debug, Clone)]
pub struct PredictCodec {
    protocol: Protocol,
    signature_name: Option<String>,
    input_shape: Vec<usize>,
}

impl PredictCodec {
    /// TF-Serving body with the `predict_images` signature
    pub fn tf_serving() -> Self {
        Self {
            protocol: Protocol::TfServing,
            signature_name: Some(DEFAULT_SIGNATURE.to_string()),
            input_shape: DEFAULT_INPUT_SHAPE.to_vec(),
        }
    }

    /// KFServing body (no signature name)
    pub fn kf_serving() -> Self {
        Self {
            protocol: Protocol::KfServing,
            signature_name: None,
            input_shape: DEFAULT_INPUT_SHAPE.to_vec(),
        }
    }

    /// JSON codec for a REST protocol; `None` for gRPC
    pub fn for_protocol(protocol: Protocol) -> Option<Self> {
        match protocol {
            Protocol::TfServing => Some(Self::tf_serving()),
            Protocol::KfServing => Some(Self::kf_serving()),
            Protocol::Grpc => None,
        }
    }

    /// Override the per-example input shape
    pub fn with_input_shape(mut self, shape: Vec<usize>) -> Self {
        self.input_shape = shape;
        self
    }

    /// Protocol this codec speaks
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Build the JSON request body for one example
    pub fn request_body(&self, example: &Example) -> Result<Value, CodecError> {
        let mut batch_shape = Vec::with_capacity(self.input_shape.len() + 1);
        batch_shape.push(1);
        batch_shape.extend_from_slice(&self.input_shape);

        let instances = example.input.reshape(batch_shape)?.to_nested_json();

        Ok(match &self.signature_name {
            Some(signature) => json!({
                "signature_name": signature,
                "instances": instances,
            }),
            None => json!({ "instances": instances }),
        })
    }
}

impl RequestCodec for PredictCodec {
    fn name(&self) -> &str {
        match self.protocol {
            Protocol::KfServing => "kf-serving",
            Protocol::TfServing | Protocol::Grpc => "tf-serving",
        }
    }

    fn encode(&self, example: &Example) -> Result<Vec<u8>, CodecError> {
        let body = self.request_body(example)?;
        Ok(serde_json::to_vec(&body)?)
    }

    fn decode(&self, body: &[u8]) -> Result<usize, CodecError> {
        let response: Value = serde_json::from_slice(body)?;

        let predictions = response
            .get("predictions")
            .or_else(|| response.get("outputs"))
            .ok_or(CodecError::MissingField("predictions"))?;

        argmax(&extract_scores(predictions)?)
    }
}

/// Find the first score row in a prediction value
fn extract_scores(value: &Value) -> Result<Vec<f64>, CodecError> {
    match value {
        Value::Object(map) => {
            extract_scores(map.get("scores").ok_or(CodecError::MissingField("scores"))?)
        }
        Value::Array(items) => match items.first() {
            None => Err(CodecError::EmptyScores),
            Some(Value::Number(_)) => items
                .iter()
                .map(|v| v.as_f64().ok_or(CodecError::MissingField("scores")))
                .collect(),
            Some(first) => extract_scores(first),
        },
        _ => Err(CodecError::MissingField("scores")),
    }
}

/// Index of the highest score; the first maximum wins ties
pub(crate) fn argmax(scores: &[f64]) -> Result<usize, CodecError> {
    let (first, rest) = scores.split_first().ok_or(CodecError::EmptyScores)?;

    let mut best = 0;
    let mut best_score = *first;
    for (i, &score) in rest.iter().enumerate() {
        if score > best_score {
            best = i + 1;
            best_score = score;
        }
    }
    Ok(best)
}
