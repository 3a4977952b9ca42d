//! Error types delivered through a request's error channel.
//!
//! # Design
//! Every failure, including a body that cannot be encoded, reaches the caller
//! through the same settlement channel as a success. `Transport` carries the
//! transport's payload untouched so callers see exactly what the platform
//! reported; `InvalidJson` is kept apart so a bad JSON body is never confused
//! with a network failure.

use crate::http::ErrorPayload;

/// Errors a request can settle with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    /// The request data could not be encoded for the selected content type.
    /// Reported before the transport is opened.
    #[error("request construction failed: {0}")]
    Construction(String),

    /// The transport reported a failure (timeout, DNS, refused connection,
    /// failure status). The payload is passed through unchanged.
    #[error("transport error: {0}")]
    Transport(ErrorPayload),

    /// The response declared a JSON content type but the body did not parse.
    #[error("invalid JSON response: {0}")]
    InvalidJson(String),

    /// The request was aborted by its owner before it settled.
    #[error("request cancelled")]
    Cancelled,
}

impl RequestError {
    /// Transport payload, if this error came from the transport.
    pub fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            RequestError::Transport(payload) => Some(payload),
            _ => None,
        }
    }
}
