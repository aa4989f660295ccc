//! Error types shared across the transport, upload and configuration layers.
//!
//! Every failure is scoped to one call, one task or one resource. Nothing here
//! is fatal to the process.

/// Failure of a single call against the delivery API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached at all (DNS, connection refused, timeout).
    #[error("Network error: could not reach the server, please try again ({0})")]
    Network(String),

    /// The server answered with a status outside 200-299.
    #[error("HTTP error! status: {status}")]
    Http { status: u16, message: String },

    /// The response body was not the JSON shape we expected.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (bad base URL, invalid MIME type, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Caller-facing failures of the upload coordinator's operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Unknown upload task: {0}")]
    UnknownTask(String),

    #[error("Task {id} is {status} and cannot be removed until it finishes")]
    TaskActive { id: String, status: &'static str },

    #[error("{active} upload(s) still in progress")]
    UploadsInFlight { active: usize },

    #[error("Invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Task {id} has not failed ({status}); only failed tasks can be resubmitted")]
    NotFailed { id: String, status: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
