//! Benchmark control loop

use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;

use crate::config::DispatchMode;
use crate::error::{BenchError, BenchResult};
use crate::metrics::RunSummary;
use crate::request::{Example, PendingRequest};
use crate::sink::PredictionLog;
use crate::traits::{AsyncTransport, ExampleSource, RequestCodec, Transport, TransportError};

use super::aggregator::ResultAggregator;
use super::completion::CompletionHandler;

/// Transport plugged into the driver, tagged with how it completes
#[derive(Clone)]
pub enum TransportHandle {
    /// Blocking call on the control thread; outcome recorded inline
    Inline(Arc<dyn Transport>),
    /// Non-blocking call completing through a callback
    Callback(Arc<dyn AsyncTransport>),
    /// Blocking call moved onto a worker, completing through a callback
    Worker(Arc<dyn AsyncTransport>),
}

impl TransportHandle {
    /// Dispatch mode this handle implements
    pub fn mode(&self) -> DispatchMode {
        match self {
            TransportHandle::Inline(_) => DispatchMode::Inline,
            TransportHandle::Callback(_) => DispatchMode::Callback,
            TransportHandle::Worker(_) => DispatchMode::Worker,
        }
    }

    /// Name of the underlying transport
    pub fn name(&self) -> &str {
        match self {
            TransportHandle::Inline(t) => t.name(),
            TransportHandle::Callback(t) | TransportHandle::Worker(t) => t.name(),
        }
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle")
            .field("mode", &self.mode())
            .field("transport", &self.name())
            .finish()
    }
}

/// Runs a fixed number of requests with bounded concurrency
///
/// Use [`DriverBuilder`](super::DriverBuilder) for construction.
pub struct BenchmarkDriver {
    /// Requests per run
    pub(crate) num_tests: usize,

    /// Requested concurrency limit
    pub(crate) concurrency: usize,

    /// Request codec (shared with completion callbacks)
    pub(crate) codec: Arc<dyn RequestCodec>,

    /// Optional prediction log
    pub(crate) sink: Option<Arc<PredictionLog>>,

    /// Optional progress bar, ticked on every completion
    pub(crate) progress: Option<ProgressBar>,
}

impl BenchmarkDriver {
    /// Number of requests per run
    pub fn num_tests(&self) -> usize {
        self.num_tests
    }

    /// Concurrency limit actually applied (capped at `num_tests`)
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.min(self.num_tests)
    }

    /// Run the benchmark
    ///
    /// Pulls `num_tests` examples from `source`, admits each through the
    /// aggregator, encodes and dispatches it, then blocks until every
    /// outcome is recorded. Per-request failures only show up in the
    /// returned error rate; `Err` is reserved for an unusable source.
    pub fn run<S>(&self, source: &mut S, transport: &TransportHandle) -> BenchResult<RunSummary>
    where
        S: ExampleSource + ?Sized,
    {
        let concurrency = self.effective_concurrency();
        let aggregator = Arc::new(ResultAggregator::new(self.num_tests, concurrency));
        let handler = Arc::new(CompletionHandler {
            aggregator: Arc::clone(&aggregator),
            codec: Arc::clone(&self.codec),
            sink: self.sink.clone(),
            progress: self.progress.clone(),
        });

        tracing::info!(
            num_tests = self.num_tests,
            concurrency,
            dispatch = %transport.mode(),
            transport = transport.name(),
            codec = self.codec.name(),
            source = source.name(),
            dataset_size = source.len(),
            "Starting benchmark"
        );

        let started_at = chrono::Utc::now();
        let start = Instant::now();

        for index in 0..self.num_tests {
            let example = match next_example(source) {
                Ok(example) => example,
                Err(e) => {
                    // Completions still write to the sink and progress bar
                    aggregator.wait_until_idle();
                    self.finish("Benchmark aborted");
                    tracing::error!(index, error = %e, "Example source failed, run aborted");
                    return Err(e);
                }
            };

            aggregator.admit();

            let body = match self.codec.encode(example) {
                Ok(body) => body,
                Err(e) => {
                    handler.complete(PendingRequest::new(index, example), Err(TransportError::from(e)));
                    continue;
                }
            };

            // Latency covers the transport round trip, not encoding
            let pending = PendingRequest::new(index, example);
            match transport {
                TransportHandle::Inline(t) => {
                    let result = t.send(body);
                    handler.complete(pending, result);
                }
                TransportHandle::Callback(t) | TransportHandle::Worker(t) => {
                    let handler = Arc::clone(&handler);
                    t.send_async(
                        body,
                        Box::new(move |result| handler.complete(pending, result)),
                    );
                }
            }
        }

        let error_rate = aggregator.wait_for_all();
        let elapsed = start.elapsed();
        let finished_at = chrono::Utc::now();
        self.finish("Benchmark complete");

        let counters = aggregator.snapshot();
        let summary = RunSummary {
            total: counters.total,
            concurrency,
            dispatch: transport.mode(),
            completed: counters.completed,
            errors: counters.errors,
            wrong_labels: counters.wrong_labels,
            transport_failures: counters.transport_failures,
            error_rate,
            elapsed,
            latency: aggregator.latency(),
            started_at,
            finished_at,
        };

        tracing::info!(
            elapsed_secs = summary.elapsed_secs(),
            error_rate = summary.error_rate,
            wrong_labels = summary.wrong_labels,
            transport_failures = summary.transport_failures,
            epochs_completed = source.epochs_completed(),
            "Benchmark completed"
        );

        Ok(summary)
    }
}

impl BenchmarkDriver {
    /// Flush the prediction log and close the progress bar
    fn finish(&self, message: &'static str) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.flush() {
                tracing::warn!(path = %sink.path().display(), error = %e, "Failed to flush prediction log");
            }
        }
        if let Some(progress) = &self.progress {
            progress.finish_with_message(message);
        }
    }
}

fn next_example<S>(source: &mut S) -> BenchResult<&Example>
where
    S: ExampleSource + ?Sized,
{
    source
        .next_batch(1)
        .map_err(|e| BenchError::dataset(e.to_string()))?
        .first()
        .ok_or_else(|| BenchError::dataset("example source returned an empty batch"))
}

impl std::fmt::Debug for BenchmarkDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkDriver")
            .field("num_tests", &self.num_tests)
            .field("concurrency", &self.concurrency)
            .field("codec", &self.codec.name())
            .field("sink", &self.sink)
            .finish()
    }
}
