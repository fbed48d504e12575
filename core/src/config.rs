//! Benchmark configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire protocol spoken by the serving endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// TensorFlow Serving REST API (`signature_name` + `instances`)
    #[default]
    TfServing,
    /// KFServing v1 REST API (`instances` only)
    KfServing,
    /// TensorFlow Serving `PredictionService.Predict` over gRPC
    Grpc,
}

impl Protocol {
    /// Whether requests go over gRPC rather than the REST predict API
    pub fn is_grpc(&self) -> bool {
        matches!(self, Protocol::Grpc)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::TfServing => write!(f, "tf_serving"),
            Protocol::KfServing => write!(f, "kf_serving"),
            Protocol::Grpc => write!(f, "grpc"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tf_serving" | "tf-serving" | "tfserving" | "tf" => Ok(Protocol::TfServing),
            "kf_serving" | "kf-serving" | "kfserving" | "kf" => Ok(Protocol::KfServing),
            "grpc" | "tf-grpc" => Ok(Protocol::Grpc),
            _ => Err(format!("Unknown protocol: {}", s)),
        }
    }
}

/// How requests are handed to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Non-blocking send, outcome recorded by a completion callback
    #[default]
    Callback,
    /// Blocking send executed on a worker thread, outcome recorded there
    Worker,
    /// Blocking send on the control thread, outcome recorded inline
    Inline,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::Callback => write!(f, "callback"),
            DispatchMode::Worker => write!(f, "worker"),
            DispatchMode::Inline => write!(f, "inline"),
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "callback" | "async" => Ok(DispatchMode::Callback),
            "worker" | "pool" => Ok(DispatchMode::Worker),
            "inline" | "sync" => Ok(DispatchMode::Inline),
            _ => Err(format!("Unknown dispatch mode: {}", s)),
        }
    }
}

/// Benchmark configuration
///
/// Everything the driver and its collaborators need for one run. Built from
/// CLI flags or loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Serving endpoint as `host:port`
    pub target: String,

    /// Model name used in the predict URL
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Number of requests to issue
    #[serde(default = "default_num_tests")]
    pub num_tests: usize,

    /// Maximum number of requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Directory holding `validation_label.txt` and `val/`
    pub data_dir: PathBuf,

    /// Wire protocol
    #[serde(default)]
    pub protocol: Protocol,

    /// Dispatch mode
    #[serde(default)]
    pub dispatch: DispatchMode,

    /// Per-request timeout
    #[serde(default = "default_timeout", with = "crate::metrics::duration_secs")]
    pub timeout: Duration,

    /// Optional path of the prediction log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_predictions: Option<PathBuf>,

    /// Reshuffle the dataset when it wraps around
    #[serde(default)]
    pub shuffle: bool,

    /// Seed for the reshuffle RNG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_model_name() -> String {
    "inception_v3".to_string()
}

fn default_num_tests() -> usize {
    100
}

fn default_concurrency() -> usize {
    1
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl BenchConfig {
    /// Create a config for the given target and data directory with defaults
    pub fn new(target: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            model_name: default_model_name(),
            num_tests: default_num_tests(),
            concurrency: default_concurrency(),
            data_dir: data_dir.into(),
            protocol: Protocol::default(),
            dispatch: DispatchMode::default(),
            timeout: DEFAULT_TIMEOUT,
            save_predictions: None,
            shuffle: false,
            seed: None,
        }
    }

    /// Load a config from a JSON file
    pub fn from_file(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            BenchError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Set the model name
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Set the number of requests
    pub fn with_num_tests(mut self, num_tests: usize) -> Self {
        self.num_tests = num_tests;
        self
    }

    /// Set the concurrency limit
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the protocol
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the dispatch mode
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable the prediction log
    pub fn with_save_predictions(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_predictions = Some(path.into());
        self
    }

    /// Enable reshuffling on wraparound
    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    /// Concurrency actually used by the driver (capped at `num_tests`)
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.min(self.num_tests)
    }

    /// Predict URL for the configured target and model
    pub fn predict_url(&self) -> String {
        format!("http://{}/v1/models/{}:predict", self.target, self.model_name)
    }

    /// Address the transport connects to for the configured protocol
    ///
    /// gRPC dials the bare target; the REST protocols post to the model's
    /// predict URL.
    pub fn endpoint(&self) -> String {
        match self.protocol {
            Protocol::Grpc => format!("http://{}", self.target),
            Protocol::TfServing | Protocol::KfServing => self.predict_url(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.trim().is_empty() {
            return Err(ConfigError::InvalidTarget("target must not be empty".into()));
        }

        if self.model_name.trim().is_empty() {
            return Err(ConfigError::InvalidModelName(
                "model name must not be empty".into(),
            ));
        }

        if self.num_tests == 0 {
            return Err(ConfigError::InvalidNumTests(
                "num_tests must be at least 1".into(),
            ));
        }

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "concurrency must be at least 1".into(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(self.timeout));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    /// Invalid target endpoint
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Invalid model name
    #[error("Invalid model name: {0}")]
    InvalidModelName(String),

    /// Invalid request count
    #[error("Invalid num_tests: {0}")]
    InvalidNumTests(String),

    /// Invalid concurrency value
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid timeout
    #[error("Invalid timeout: {0:?}")]
    InvalidTimeout(Duration),
}

impl From<ConfigError> for BenchError {
    fn from(err: ConfigError) -> Self {
        BenchError::config(err.to_string())
    }
}
