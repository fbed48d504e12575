//! Per-request outcome types

use serde::{Deserialize, Serialize};

use crate::traits::TransportError;

/// Classification of a failed request for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request exceeded its deadline
    Timeout,
    /// Connection could not be established or was dropped
    ConnectionError,
    /// Endpoint answered with a non-success status
    ServerError,
    /// Response body could not be decoded into a label
    MalformedResponse,
    /// Example could not be encoded into a request
    EncodeError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::ConnectionError => write!(f, "connection_error"),
            ErrorKind::ServerError => write!(f, "server_error"),
            ErrorKind::MalformedResponse => write!(f, "malformed_response"),
            ErrorKind::EncodeError => write!(f, "encode_error"),
        }
    }
}

/// Why a request did not count as correct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncorrectReason {
    /// The endpoint answered but predicted a different class
    WrongLabel {
        /// Ground-truth label
        expected: usize,
        /// Label decoded from the response
        predicted: usize,
    },
    /// No usable prediction came back
    TransportError(ErrorKind),
}

/// Outcome of one request, consumed immediately by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Prediction matched the expected label
    Correct,
    /// Prediction was wrong or missing
    Incorrect(IncorrectReason),
}

impl Outcome {
    /// Compare a decoded prediction against the expected label
    pub fn from_prediction(expected: usize, predicted: usize) -> Self {
        if expected == predicted {
            Outcome::Correct
        } else {
            Outcome::Incorrect(IncorrectReason::WrongLabel {
                expected,
                predicted,
            })
        }
    }

    /// Outcome of a request that failed before a prediction was available
    pub fn transport_failure(error: &TransportError) -> Self {
        Outcome::Incorrect(IncorrectReason::TransportError(error.kind()))
    }

    /// Whether this outcome counts towards the error rate
    pub fn is_incorrect(&self) -> bool {
        matches!(self, Outcome::Incorrect(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_prediction() {
        assert_eq!(Outcome::from_prediction(5, 5), Outcome::Correct);
        assert_eq!(
            Outcome::from_prediction(5, 7),
            Outcome::Incorrect(IncorrectReason::WrongLabel {
                expected: 5,
                predicted: 7
            })
        );
    }

    #[test]
    fn test_outcome_is_incorrect() {
        assert!(!Outcome::Correct.is_incorrect());
        assert!(
            Outcome::Incorrect(IncorrectReason::TransportError(ErrorKind::ServerError))
                .is_incorrect()
        );
    }

    #[test]
    fn test_outcome_json_format() {
        let json = serde_json::to_string(&Outcome::from_prediction(1, 2)).unwrap();
        assert_eq!(
            json,
            r#"{"incorrect":{"wrong_label":{"expected":1,"predicted":2}}}"#
        );
    }
}
