/// Player application errors
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command: {0}")]
    Command(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] hybrid_core::HybridError),

    #[error("Playback error: {0}")]
    Playback(#[from] hybrid_playback::PlaybackError),

    #[error("Storage error: {0}")]
    Storage(#[from] hybrid_storage::StorageError),

    #[error("Server client error: {0}")]
    Client(#[from] hybrid_server_client::ServerClientError),

    #[error("Audio error: {0}")]
    Audio(#[from] hybrid_audio_desktop::AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
