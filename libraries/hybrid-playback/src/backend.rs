//! Backend abstraction
//!
//! A backend is one concrete way of producing sound: native audio playback
//! of a URL, or an embedded third-party video player. The adapter picks one
//! per track, talks to it only through [`PlaybackBackend`], and never runs
//! two at once.
//!
//! Hosts (desktop, tests, ...) provide backends through [`BackendHost`].

use crate::error::Result;
use crate::events::{BackendEvent, Interaction};
use crate::source::MediaSource;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

/// Backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Native audio playback of a URL (mp3, local, drive, dropbox)
    NativeAudio,
    /// Embedded third-party video player (youtube)
    EmbeddedVideo,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeAudio => "native_audio",
            Self::EmbeddedVideo => "embedded_video",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sender half of a backend's event channel
///
/// A fresh channel is created for every load; events sent after the
/// adapter moved on are dropped.
pub type BackendEvents = mpsc::UnboundedSender<BackendEvent>;

/// What a backend reports once it can play
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendReady {
    /// Track duration in seconds (0 when unknown)
    pub duration: f64,
}

/// One playback backend instance
///
/// # Volume
///
/// `set_volume` receives the backend's native scale: 0.0-1.0 for
/// [`BackendKind::NativeAudio`], 0-100 for [`BackendKind::EmbeddedVideo`].
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Backend family
    fn kind(&self) -> BackendKind;

    /// Load a source and wait until it is ready to play
    ///
    /// # Errors
    ///
    /// `PlaybackError::BackendLoad` when the source cannot be opened.
    async fn load(&mut self, source: &MediaSource) -> Result<BackendReady>;

    /// Start or resume playback
    ///
    /// # Errors
    ///
    /// `PlaybackError::AutoplayRejected` when the host requires a user
    /// gesture first.
    async fn play(&mut self) -> Result<()>;

    /// Pause playback, keeping the position
    async fn pause(&mut self) -> Result<()>;

    /// Jump to `position` seconds
    async fn seek(&mut self, position: f64) -> Result<()>;

    /// Set the volume in the backend's native scale
    async fn set_volume(&mut self, volume: f64) -> Result<()>;

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Duration in seconds (0 when unknown)
    fn duration(&self) -> f64;

    /// Stop and free every resource; the instance is not used afterwards
    async fn release(&mut self);
}

/// Factory for backends plus the host's user-interaction stream
#[async_trait]
pub trait BackendHost: Send + Sync {
    /// Create a native audio backend that reports to `events`
    fn native_audio(&self, events: BackendEvents) -> Result<Box<dyn PlaybackBackend>>;

    /// Create an embedded video backend that reports to `events`
    ///
    /// The host loads the third-party player API lazily, at most once per
    /// session, the first time this is called.
    async fn embedded_video(&self, events: BackendEvents) -> Result<Box<dyn PlaybackBackend>>;

    /// Subscribe to user interactions (clicks, key presses)
    fn interactions(&self) -> broadcast::Receiver<Interaction>;
}
