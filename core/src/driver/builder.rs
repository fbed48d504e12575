//! Builder pattern for BenchmarkDriver construction

use std::sync::Arc;

use indicatif::ProgressBar;

use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};
use crate::sink::PredictionLog;
use crate::traits::RequestCodec;

use super::executor::BenchmarkDriver;

/// Builder for creating a BenchmarkDriver
///
/// # Example
///
/// ```ignore
/// let driver = DriverBuilder::new()
///     .num_tests(1000)
///     .concurrency(8)
///     .codec(codec)
///     .build()?;
///
/// let summary = driver.run(&mut dataset, &TransportHandle::Callback(transport))?;
/// ```
pub struct DriverBuilder {
    num_tests: usize,
    concurrency: usize,
    codec: Option<Arc<dyn RequestCodec>>,
    sink: Option<Arc<PredictionLog>>,
    progress: Option<ProgressBar>,
}

impl DriverBuilder {
    /// Create a new driver builder (100 requests, concurrency 1)
    pub fn new() -> Self {
        Self {
            num_tests: 100,
            concurrency: 1,
            codec: None,
            sink: None,
            progress: None,
        }
    }

    /// Take request count and concurrency from a config
    pub fn config(mut self, config: &BenchConfig) -> Self {
        self.num_tests = config.num_tests;
        self.concurrency = config.concurrency;
        self
    }

    /// Set the number of requests
    pub fn num_tests(mut self, num_tests: usize) -> Self {
        self.num_tests = num_tests;
        self
    }

    /// Set the concurrency limit
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the request codec
    pub fn codec(mut self, codec: Arc<dyn RequestCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Attach a prediction log
    pub fn sink(mut self, sink: Arc<PredictionLog>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach a progress bar
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Build the driver
    ///
    /// # Errors
    ///
    /// Returns an error if the codec is not set or either count is zero.
    pub fn build(self) -> BenchResult<BenchmarkDriver> {
        let codec = self.codec.ok_or_else(|| BenchError::missing_config("codec"))?;

        if self.num_tests == 0 {
            return Err(BenchError::config("num_tests must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(BenchError::config("concurrency must be at least 1"));
        }

        Ok(BenchmarkDriver {
            num_tests: self.num_tests,
            concurrency: self.concurrency,
            codec,
            sink: self.sink,
            progress: self.progress,
        })
    }
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
