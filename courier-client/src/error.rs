//! Error types for the task server client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the task server
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connection refused, DNS, I/O)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with a non-success status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body, or the status text when the body was empty
        message: String,
    },

    /// The server answered "no content" where a body was required
    #[error("server returned no content")]
    NoContent,

    /// Failed to encode a request or decode a response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The credential provider could not supply a token
    #[error("could not obtain token: {0}")]
    Token(String),

    /// The governing cancellation token fired
    #[error("request cancelled")]
    Cancelled,

    /// A per-call timeout elapsed
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }
}
