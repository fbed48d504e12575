//! reqwest-backed HTTP transport
//!
//! One [`HttpTransport`] serves both dispatch shapes: the blocking
//! [`Transport`] impl drives the request to completion with
//! `Handle::block_on`, and the [`AsyncTransport`] impl spawns it onto the
//! runtime and invokes the completion callback from a runtime thread.

use std::sync::Arc;
use std::time::Duration;

use inferbench_core::{AsyncTransport, CompletionCallback, Transport, TransportError};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::runtime::Handle;

/// Longest error body kept in [`TransportError::Status`]
const MAX_ERROR_BODY: usize = 512;

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout (connect + send + full body read)
    pub request_timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Idle connection timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: inferbench_core::config::DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 64,
            user_agent: format!("inferbench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Create config with custom request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Create config with custom pool size.
    pub fn with_pool_max_idle(mut self, max_idle: usize) -> Self {
        self.pool_max_idle_per_host = max_idle;
        self
    }
}

// ============================================================================
// Transport
// ============================================================================

/// POSTs JSON bodies to a single predict URL
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: Arc<str>,
    timeout: Duration,
    runtime: Handle,
}

impl HttpTransport {
    /// Create a transport for `url`, running requests on `runtime`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, config: &HttpConfig, runtime: Handle) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            url: Arc::from(url.into()),
            timeout: config.request_timeout,
            runtime,
        })
    }

    /// Target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request body and read the full response
    pub async fn predict(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        post(&self.client, &self.url, self.timeout, body).await
    }
}

async fn post(client: &Client, url: &str, timeout: Duration, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .timeout(timeout)
        .body(body)
        .send()
        .await
        .map_err(|e| map_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(|e| map_error(e, timeout))?;
    Ok(bytes.to_vec())
}

fn map_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_decode() || err.is_body() {
        TransportError::MalformedResponse(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    /// Must not be called from inside an async context.
    fn send(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        self.runtime.block_on(self.predict(body))
    }
}

impl AsyncTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn send_async(&self, body: Vec<u8>, on_done: CompletionCallback) {
        let client = self.client.clone();
        let url = Arc::clone(&self.url);
        let timeout = self.timeout;

        self.runtime.spawn(async move {
            let result = post(&client, &url, timeout, body).await;
            on_done(result);
        });
    }
}
