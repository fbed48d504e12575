//! JSON export functionality

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use inferbench_core::RunSummary;
use serde_json::{json, Value};
use thiserror::Error;

/// Report writing errors
#[derive(Error, Debug)]
pub enum ReportError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes run summaries as pretty-printed JSON
pub struct JsonExporter;

impl JsonExporter {
    /// Build the JSON document for a summary
    pub fn to_value(summary: &RunSummary) -> Value {
        let latency = &summary.latency;
        json!({
            "summary": {
                "overall": {
                    "total_requests": summary.total,
                    "completed_requests": summary.completed,
                    "errors": summary.errors,
                    "wrong_labels": summary.wrong_labels,
                    "transport_failures": summary.transport_failures,
                    "error_rate": summary.error_rate,
                    "accuracy_percent": summary.accuracy() * 100.0,
                },
                "timing": {
                    "elapsed_secs": summary.elapsed_secs(),
                    "requests_per_second": summary.requests_per_second(),
                    "concurrency": summary.concurrency,
                    "dispatch": summary.dispatch,
                    "started_at": summary.started_at,
                    "finished_at": summary.finished_at,
                },
                "latency": {
                    "min_ms": latency.min,
                    "avg_ms": latency.mean,
                    "stddev_ms": latency.stddev,
                    "p50_ms": latency.p50,
                    "p90_ms": latency.p90,
                    "p95_ms": latency.p95,
                    "p99_ms": latency.p99,
                    "max_ms": latency.max,
                },
            },
            "run": summary,
        })
    }

    /// Export a summary to `path`, replacing any existing file
    pub fn export(summary: &RunSummary, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &Self::to_value(summary))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
