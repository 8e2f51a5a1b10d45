//! Hybrid Player - Playback
//!
//! Multi-source playback for Hybrid Player.
//!
//! This crate provides:
//! - `PlayerStore`: the shared player state every component reads and writes
//! - Source resolution for mp3, local, Google Drive, Dropbox and YouTube tracks
//! - `PlaybackAdapter`: one control surface over native audio and embedded
//!   video backends
//! - `PlaybackScheduler`: starts and stops playback from a weekly schedule
//! - Persistence of loop mode, scheduler state, schedule and resume position
//!
//! # Architecture
//!
//! `hybrid-playback` knows nothing about audio devices, HTTP or databases:
//! - Backends are provided by a host through the `BackendHost` trait
//! - Durable storage comes in through `hybrid_core::PreferenceStore`
//! - The track catalog comes in through `hybrid_core::TrackCatalog`
//!
//! Components never call each other for state. The adapter writes what the
//! backends report into the store; the scheduler asks the store for a load
//! and the adapter's store follower performs it.
//!
//! # Example: Wiring
//!
//! ```rust,no_run
//! use hybrid_playback::{PlaybackAdapter, PlaybackScheduler, PlayerConfig, PlayerStore, BackendHost};
//! use std::sync::Arc;
//!
//! # async fn example(host: Arc<dyn BackendHost>) {
//! let config = PlayerConfig::default();
//! let store = PlayerStore::new();
//!
//! let adapter = PlaybackAdapter::new(store.clone(), host, config.clone());
//! adapter.spawn_store_follower().await;
//!
//! let scheduler = PlaybackScheduler::new(adapter.clone(), config);
//! scheduler.launch();
//!
//! store.set_scheduler_enabled(true);
//! println!("{}", scheduler.check_now().await);
//! # }
//! ```

pub mod adapter;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod persistence;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod volume;

pub use adapter::PlaybackAdapter;
pub use backend::{BackendEvents, BackendHost, BackendKind, BackendReady, PlaybackBackend};
pub use config::PlayerConfig;
pub use error::{PlaybackError, Result};
pub use events::{BackendEvent, Interaction};
pub use persistence::{apply_persisted, load_persisted, spawn_persister, PersistedPlayer};
pub use scheduler::{
    local_time, should_be_playing, Clock, LocalTime, PlaybackScheduler, ScheduleAction,
    SystemClock,
};
pub use source::{CorsMode, MediaSource};
pub use store::{PlaybackState, PlayerStore};
