//! Desktop playback backends using CPAL and Symphonia
//!
//! This crate provides the `DesktopBackendHost` implementation of
//! `hybrid_playback::BackendHost` for the desktop player.
//!
//! # Features
//!
//! - Native sources from http(s) URLs, `file://` URLs and plain paths
//! - Decoding of MP3, WAV, FLAC, OGG and AAC through Symphonia
//! - Channel remixing and sample rate conversion to the device format
//! - Output on the default CPAL device, owned by a dedicated thread
//!
//! Embedded video is not available on the desktop; the adapter skips tracks
//! that need it.
//!
//! # Example
//!
//! ```no_run
//! use hybrid_audio_desktop::DesktopBackendHost;
//! use hybrid_playback::{PlaybackAdapter, PlayerConfig, PlayerStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let host = Arc::new(DesktopBackendHost::new()?);
//! let store = PlayerStore::new();
//! let adapter = PlaybackAdapter::new(store, host, PlayerConfig::default());
//! adapter.spawn_store_follower().await;
//! # Ok(())
//! # }
//! ```

mod backend;
pub mod decode;
mod error;
pub mod fetch;
mod host;
mod output;

pub use backend::CpalAudioBackend;
pub use decode::{decode, remix, resample_linear, DecodedAudio};
pub use error::{AudioError, Result};
pub use fetch::{fetch, FetchedAudio};
pub use host::DesktopBackendHost;
pub use output::AudioOutput;
