//! Error types for the tables API client.
//!
//! Nothing in this crate recovers from these errors locally. Every failure is
//! logged where it happens and then handed back to the caller unchanged.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the request layer and the collection accessors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote service answered with a status outside 200..=299.
    #[error("request failed with status {status}")]
    RequestFailed { status: u16 },

    /// The request never produced a response (connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The body decoded, but not into the shape the caller asked for.
    #[error("unexpected response shape: expected {expected}")]
    UnexpectedShape { expected: &'static str },
}

impl ApiError {
    /// Status code carried by a `RequestFailed` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status } => Some(*status),
            _ => None,
        }
    }
}
