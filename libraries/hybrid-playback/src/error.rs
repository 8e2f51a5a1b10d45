//! Error types for playback

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A track's `src` could not be turned into something playable
    #[error("Could not resolve source: {0}")]
    SourceResolution(String),

    /// The backend reported an error while loading
    #[error("Backend failed to load: {0}")]
    BackendLoad(String),

    /// The host refused to start playback without a user gesture
    #[error("Playback was rejected by the autoplay policy")]
    AutoplayRejected,

    /// Any other backend failure (play, seek, release)
    #[error("Backend error: {0}")]
    Backend(String),

    /// A newer load replaced this one before it finished
    #[error("Load superseded by a newer request")]
    Superseded,

    /// Catalog or storage failure surfaced through the store
    #[error(transparent)]
    Core(#[from] hybrid_core::HybridError),
}

impl PlaybackError {
    /// Create a source resolution error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::SourceResolution(msg.into())
    }

    /// Create a backend load error
    pub fn load(msg: impl Into<String>) -> Self {
        Self::BackendLoad(msg.into())
    }

    /// Create a generic backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
