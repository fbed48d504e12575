//! inferbench-core: bounded-concurrency benchmarking of inference endpoints
//!
//! This crate holds the pieces of inferbench that coordinate concurrent work:
//!
//! - The [`ResultAggregator`], a lock + condition variable gate that bounds
//!   the number of requests in flight and blocks until every outcome is known
//! - The [`BenchmarkDriver`], the control loop that pulls examples, admits,
//!   encodes and dispatches requests, and reports the error rate
//! - Capability traits for the collaborators the driver is agnostic of
//!   ([`ExampleSource`], [`RequestCodec`], [`Transport`], [`AsyncTransport`])
//! - Configuration, error types, latency metrics and the prediction log

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod request;
pub mod response;
pub mod sink;
pub mod traits;

pub use config::{BenchConfig, ConfigError, DispatchMode, Protocol};
pub use driver::{
    AggregateCounters, BenchmarkDriver, DriverBuilder, ResultAggregator, TransportHandle,
};
pub use error::*;
pub use metrics::*;
pub use request::*;
pub use response::*;
pub use sink::PredictionLog;
pub use traits::*;
