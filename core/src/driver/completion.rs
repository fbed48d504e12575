//! Outcome resolution on the completion path

use std::sync::Arc;

use indicatif::ProgressBar;

use crate::request::PendingRequest;
use crate::response::Outcome;
use crate::sink::PredictionLog;
use crate::traits::{RequestCodec, TransportError};

use super::aggregator::ResultAggregator;

/// Everything a completion needs, shared by all in-flight requests
///
/// Runs on whichever thread the transport completes on. Transport and
/// decode failures end here as counted errors; nothing propagates.
pub(crate) struct CompletionHandler {
    pub(crate) aggregator: Arc<ResultAggregator>,
    pub(crate) codec: Arc<dyn RequestCodec>,
    pub(crate) sink: Option<Arc<PredictionLog>>,
    pub(crate) progress: Option<ProgressBar>,
}

impl CompletionHandler {
    /// Resolve and record the outcome of one request
    pub(crate) fn complete(&self, pending: PendingRequest, result: Result<Vec<u8>, TransportError>) {
        let latency = pending.dispatched_at.elapsed();

        let outcome = match result.and_then(|body| self.codec.decode(&body).map_err(Into::into)) {
            Ok(predicted) => {
                if let Some(sink) = &self.sink {
                    sink.record(&pending.example_id, predicted);
                }
                let outcome = Outcome::from_prediction(pending.expected_label, predicted);
                tracing::debug!(
                    index = pending.index,
                    example = %pending.example_id,
                    expected = pending.expected_label,
                    predicted,
                    latency_ms = latency.as_secs_f64() * 1000.0,
                    "Request completed"
                );
                outcome
            }
            Err(e) => {
                tracing::warn!(
                    index = pending.index,
                    example = %pending.example_id,
                    error = %e,
                    "Request failed"
                );
                Outcome::transport_failure(&e)
            }
        };

        self.aggregator.resolve(&outcome, latency);

        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
    }
}
