//! Hybrid Player - console player with scheduled playback
//!
//! The binary wires the libraries together: SQLite preferences, the track
//! catalog client, the desktop audio host, the playback adapter and the
//! scheduler. This library half holds the pieces that are worth testing on
//! their own.

pub mod config;
pub mod console;
pub mod error;

pub use config::AppConfig;
pub use console::{Command, Console};
pub use error::{AppError, Result};
