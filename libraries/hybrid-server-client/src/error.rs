//! Error types for the catalog API client.

use hybrid_core::HybridError;
use thiserror::Error;

/// Errors that can occur when talking to the catalog API.
#[derive(Error, Debug)]
pub enum ServerClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// The requested track does not exist
    #[error("Track not found: {0}")]
    NotFound(String),

    /// Invalid API URL
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

/// Result type for catalog client operations.
pub type Result<T> = std::result::Result<T, ServerClientError>;

impl From<ServerClientError> for HybridError {
    fn from(err: ServerClientError) -> Self {
        match err {
            ServerClientError::NotFound(id) => HybridError::not_found("Track", id),
            ServerClientError::ServerUnreachable(msg) => HybridError::Network(msg),
            ServerClientError::Request(e) => HybridError::Network(e.to_string()),
            ServerClientError::InvalidUrl(msg) => HybridError::invalid_input(msg),
            other => HybridError::catalog(other.to_string()),
        }
    }
}
