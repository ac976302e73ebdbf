//! Error types for the control-plane client.

use thiserror::Error;

/// HTTP status the control plane uses for a missing backup.
const NOT_FOUND: u16 = 404;

/// Errors raised by control-plane requests.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ControlPlaneError {
    /// Raised when the request never produced an HTTP response (connection
    /// failure or timeout).
    #[error("control plane unreachable: {message}")]
    Unreachable {
        /// Transport error message.
        message: String,
    },
    /// Raised when the control plane answers with a non-success status.
    #[error("control plane rejected request with HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, decoded lossily.
        body: String,
    },
    /// Raised when a response body cannot be decoded.
    #[error("unexpected control plane response: {message}")]
    Decode {
        /// Decoder error message.
        message: String,
    },
    /// Raised when the client cannot be constructed.
    #[error("invalid control plane client configuration: {message}")]
    Client {
        /// Builder error message.
        message: String,
    },
}

impl ControlPlaneError {
    /// Returns `true` when the control plane reported the resource missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status == NOT_FOUND)
    }
}

impl From<reqwest::Error> for ControlPlaneError {
    fn from(value: reqwest::Error) -> Self {
        Self::Unreachable {
            message: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for ControlPlaneError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode {
            message: value.to_string(),
        }
    }
}
