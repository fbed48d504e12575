//! Capability traits for the driver's collaborators
//!
//! The driver only knows these shapes. Implementations live in their
//! respective crates (transports/, datasets/).

use std::time::Duration;

use crate::request::Example;
use crate::response::ErrorKind;

// ============================================================================
// Transport Traits
// ============================================================================

/// Callback invoked once with the outcome of an asynchronous send
pub type CompletionCallback = Box<dyn FnOnce(Result<Vec<u8>, TransportError>) + Send + 'static>;

/// Blocking transport: sends one encoded request and waits for the reply
///
/// Implementations must bound the call with a timeout and report it as
/// [`TransportError::Timeout`].
pub trait Transport: Send + Sync {
    /// Transport identifier for logs (e.g., "http")
    fn name(&self) -> &str;

    /// Send a request body and return the raw response body
    fn send(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError>;
}

/// Non-blocking transport: returns immediately and completes via callback
///
/// `on_done` must be called exactly once, from any thread, including the
/// calling thread itself.
pub trait AsyncTransport: Send + Sync {
    /// Transport identifier for logs
    fn name(&self) -> &str;

    /// Start sending a request body; `on_done` receives the outcome
    fn send_async(&self, body: Vec<u8>, on_done: CompletionCallback);
}

/// Transport-level failures
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, reset or otherwise unusable
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-success HTTP status
    #[error("Server error: {status} - {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Non-OK gRPC status
    #[error("RPC error: {code} - {message}")]
    Rpc {
        /// gRPC status code name
        code: String,
        /// Status message
        message: String,
    },

    /// Response could not be read or decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Request could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),
}

impl TransportError {
    /// Convert to ErrorKind for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Connection(_) => ErrorKind::ConnectionError,
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Status { .. } | TransportError::Rpc { .. } => ErrorKind::ServerError,
            TransportError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            TransportError::Encode(_) => ErrorKind::EncodeError,
        }
    }
}

// ============================================================================
// Request Codec Trait
// ============================================================================

/// Builds protocol requests and extracts predicted labels from responses
pub trait RequestCodec: Send + Sync {
    /// Codec identifier (e.g., "tf_serving")
    fn name(&self) -> &str;

    /// Encode one example into a request body
    fn encode(&self, example: &Example) -> Result<Vec<u8>, CodecError>;

    /// Decode a response body into the predicted class index
    fn decode(&self, body: &[u8]) -> Result<usize, CodecError>;
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Tensor data does not fill its declared shape
    #[error("shape {shape:?} does not hold {len} values")]
    ShapeMismatch {
        /// Declared shape
        shape: Vec<usize>,
        /// Number of values supplied
        len: usize,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protobuf message could not be decoded
    #[error("protobuf error: {0}")]
    Protobuf(String),

    /// Expected field missing from a response
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Response carried no scores to take the argmax of
    #[error("response contained no scores")]
    EmptyScores,
}

impl From<CodecError> for TransportError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::ShapeMismatch { .. } => TransportError::Encode(err.to_string()),
            _ => TransportError::MalformedResponse(err.to_string()),
        }
    }
}

// ============================================================================
// Example Source Trait
// ============================================================================

/// Deterministic, restartable sequence of labelled examples
///
/// Owned and advanced by the driver's control thread only.
pub trait ExampleSource {
    /// Source name for identification
    fn name(&self) -> &str;

    /// Number of distinct examples in one epoch
    fn len(&self) -> usize;

    /// Whether the source holds no examples
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of completed passes over the data
    fn epochs_completed(&self) -> usize;

    /// Return the next `n` examples, wrapping to a new epoch when needed
    fn next_batch(&mut self, n: usize) -> Result<&[Example], SourceError>;
}

/// Example source errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SourceError {
    /// Source has no examples
    #[error("example source is empty")]
    Empty,

    /// Batch larger than a whole epoch
    #[error("batch size {requested} exceeds dataset size {available}")]
    BatchTooLarge {
        /// Requested batch size
        requested: usize,
        /// Examples per epoch
        available: usize,
    },
}
