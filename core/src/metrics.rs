//! Latency histogram and run summary

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DispatchMode;

/// Dispatch-to-completion latency distribution, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LatencyPercentiles {
    /// Fastest request
    pub min: f64,
    /// Median
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// Slowest request
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Standard deviation
    pub stddev: f64,
}

/// Microseconds in one millisecond
const MICROS_PER_MILLI: f64 = 1000.0;

/// Longest latency tracked exactly (one hour, in microseconds)
const MAX_TRACKED_MICROS: u64 = 3_600_000_000;

/// Fixed-size latency histogram
///
/// Values are stored in microseconds at three significant figures, so the
/// memory footprint does not grow with the number of requests.
pub struct LatencyHistogram {
    inner: hdrhistogram::Histogram<u64>,
}

impl LatencyHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        let inner = hdrhistogram::Histogram::new_with_bounds(1, MAX_TRACKED_MICROS, 3)
            .expect("static histogram bounds are valid");
        Self { inner }
    }

    /// Record one latency; values past one hour are clamped
    pub fn record(&mut self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.inner.saturating_record(micros.max(1));
    }

    /// Number of recorded latencies
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Summarize the recorded latencies
    pub fn percentiles(&self) -> LatencyPercentiles {
        if self.inner.is_empty() {
            return LatencyPercentiles::default();
        }

        let at = |q: f64| self.inner.value_at_quantile(q) as f64 / MICROS_PER_MILLI;
        LatencyPercentiles {
            min: self.inner.min() as f64 / MICROS_PER_MILLI,
            p50: at(0.50),
            p90: at(0.90),
            p95: at(0.95),
            p99: at(0.99),
            max: self.inner.max() as f64 / MICROS_PER_MILLI,
            mean: self.inner.mean() / MICROS_PER_MILLI,
            stddev: self.inner.stdev() / MICROS_PER_MILLI,
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LatencyHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyHistogram")
            .field("len", &self.inner.len())
            .finish()
    }
}

/// Final result of one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Requests issued
    pub total: usize,
    /// Concurrency limit in effect
    pub concurrency: usize,
    /// Dispatch mode used
    pub dispatch: DispatchMode,
    /// Requests whose outcome was recorded
    pub completed: usize,
    /// Requests that were not correct and successful
    pub errors: usize,
    /// Responses with a mismatched prediction
    pub wrong_labels: usize,
    /// Requests that produced no usable prediction
    pub transport_failures: usize,
    /// `errors / total`
    pub error_rate: f64,
    /// Wall-clock time from first dispatch to last completion
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    /// Dispatch-to-completion latency
    pub latency: LatencyPercentiles,
    /// When the run started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// When the last outcome was recorded
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

impl RunSummary {
    /// Elapsed wall-clock time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Fraction of requests that were correct
    pub fn accuracy(&self) -> f64 {
        1.0 - self.error_rate
    }

    /// Completed requests per second
    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed_secs();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }

    /// `(error_rate, elapsed_seconds)`
    pub fn into_tuple(self) -> (f64, f64) {
        (self.error_rate, self.elapsed_secs())
    }
}
