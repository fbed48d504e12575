//! Transport and codec implementations for inferbench
//!
//! This crate provides the wire side of a benchmark run:
//!
//! - [`PredictCodec`]: TF-Serving and KFServing JSON predict bodies
//! - [`HttpTransport`]: reqwest client usable blocking or with a callback
//! - [`GrpcCodec`] and [`GrpcTransport`]: TensorFlow Serving
//!   `PredictionService.Predict` over tonic
//! - [`OnWorker`]: runs any blocking transport on the runtime's blocking pool
//! - [`wrk`]: Lua script generation for driving the same endpoint with wrk

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod grpc;
pub mod http;
pub mod proto;
pub mod worker;
pub mod wrk;

pub use codec::PredictCodec;
pub use grpc::{GrpcCodec, GrpcTransport};
pub use http::{HttpConfig, HttpTransport};
pub use worker::OnWorker;

use std::sync::Arc;

use inferbench_core::{BenchConfig, Protocol, RequestCodec};

/// Request codec matching the configured protocol and model
pub fn codec_for(config: &BenchConfig) -> Arc<dyn RequestCodec> {
    match PredictCodec::for_protocol(config.protocol) {
        Some(codec) => Arc::new(codec),
        None => Arc::new(GrpcCodec::new(config.model_name.clone())),
    }
}
