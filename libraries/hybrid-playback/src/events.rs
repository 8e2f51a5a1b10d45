//! Backend events
//!
//! Backends report what actually happens (metadata known, playback started,
//! paused, ended, position moved, failed) over a per-load channel. These
//! events are the authoritative source of `is_playing`, `current_time` and
//! `duration` in the store.

use serde::{Deserialize, Serialize};

/// Events emitted by a playback backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendEvent {
    /// Duration became known
    LoadedMetadata {
        /// Seconds; 0 when the stream is unbounded
        duration: f64,
    },

    /// Playback started or resumed
    Playing,

    /// Playback paused
    Paused,

    /// The track reached its end
    Ended,

    /// Position moved
    TimeUpdate {
        /// Seconds from the start of the track
        position: f64,
    },

    /// The backend hit an error after loading
    Error {
        /// Human-readable description
        message: String,
    },
}

impl BackendEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadedMetadata { .. } => "loaded_metadata",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::TimeUpdate { .. } => "time_update",
            Self::Error { .. } => "error",
        }
    }
}

/// A user gesture observed by the host
///
/// Hosts that enforce an autoplay policy only allow playback to start after
/// one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interaction {
    Click,
    KeyPress,
}
