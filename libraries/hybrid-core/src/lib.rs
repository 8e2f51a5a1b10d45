//! Hybrid Player Core
//!
//! Platform-agnostic types, traits, and error handling shared by every
//! Hybrid Player crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackType`, `ScheduleConfig`, `ScheduleWindow`
//! - **Core Traits**: `TrackCatalog` (the external track API, trash
//!   included) and `PreferenceStore` (durable key/value storage)
//! - **In-memory implementations** of both traits
//! - **Error Handling**: Unified `HybridError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use hybrid_core::types::{ScheduleConfig, Track, TrackType};
//!
//! let track = Track::new("Morning Mix", "DJ", TrackType::Dropbox, "https://www.dropbox.com/s/abc/mix.mp3?dl=0");
//! assert_eq!(track.track_type, TrackType::Dropbox);
//!
//! let schedule = ScheduleConfig::default();
//! assert_eq!(schedule.weekdays.start, "11:30");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{HybridError, Result};
pub use memory::{MemoryCatalog, MemoryPreferences};
pub use traits::{PreferenceStore, TrackCatalog};

pub use types::{
    parse_clock_minutes, DayKind, ScanReport, ScheduleConfig, ScheduleWindow, Track, TrackId,
    TrackType, UpdateTrack,
};
