/// Desktop audio errors
use hybrid_playback::PlaybackError;
use thiserror::Error;

/// Result type for audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// Device not found
    #[error("Audio device not found")]
    DeviceNotFound,

    /// Device error
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuildError(String),

    /// Failed to play stream
    #[error("Failed to play stream: {0}")]
    PlayError(String),

    /// Failed to pause stream
    #[error("Failed to pause stream: {0}")]
    PauseError(String),

    /// Unsupported audio or device format
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The source could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The source could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The output thread is gone or could not start
    #[error("Output thread error: {0}")]
    OutputThread(String),

    /// I/O error reading a local file
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        AudioError::StreamBuildError(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(err: cpal::PlayStreamError) -> Self {
        AudioError::PlayError(err.to_string())
    }
}

impl From<cpal::PauseStreamError> for AudioError {
    fn from(err: cpal::PauseStreamError) -> Self {
        AudioError::PauseError(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for AudioError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        AudioError::DeviceError(err.to_string())
    }
}

impl From<reqwest::Error> for AudioError {
    fn from(err: reqwest::Error) -> Self {
        AudioError::Fetch(err.to_string())
    }
}

impl From<AudioError> for PlaybackError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::PlayError(_) | AudioError::PauseError(_) | AudioError::OutputThread(_) => {
                PlaybackError::backend(err.to_string())
            }
            other => PlaybackError::load(other.to_string()),
        }
    }
}
