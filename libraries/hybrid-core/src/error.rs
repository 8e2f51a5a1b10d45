/// Core error types for Hybrid Player
use thiserror::Error;

/// Result type alias using `HybridError`
pub type Result<T> = std::result::Result<T, HybridError>;

/// Core error type for Hybrid Player
#[derive(Error, Debug)]
pub enum HybridError {
    /// Durable storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Track catalog (external API) errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity, e.g. "Track"
        entity: String,
        /// Identifier that was looked up
        id: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),
}

impl HybridError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
