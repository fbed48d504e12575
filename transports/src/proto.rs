//! TensorFlow Serving protobuf messages and `PredictionService` stubs
//!
//! Generated at build time from the subset of the TensorFlow and
//! TensorFlow Serving protos under `proto/`.

#![allow(missing_docs)]
#![allow(clippy::all)]

pub mod tensorflow {
    tonic::include_proto!("tensorflow");

    pub mod serving {
        tonic::include_proto!("tensorflow.serving");
    }
}

pub use tensorflow::serving::prediction_service_client::PredictionServiceClient;
pub use tensorflow::serving::{ModelSpec, PredictRequest, PredictResponse};
pub use tensorflow::tensor_shape_proto::Dim;
pub use tensorflow::{DataType, TensorProto, TensorShapeProto};
