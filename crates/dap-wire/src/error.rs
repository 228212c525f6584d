//! Error types for the transport seam.

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures reported by a [`crate::Transport`] implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Could not reach the server or the connection dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server did not answer in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server reported that the dataset does not exist.
    #[error("no such dataset: {0}")]
    NotFound(String),

    /// The response could not be parsed.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Create a Connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a Malformed error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
