//! Player configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the adapter and the scheduler
///
/// Every field has a default so the struct can be deserialized from a
/// partial config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Origin of the API backend; `local` tracks under `music_path_prefix`
    /// are served from here
    #[serde(default = "default_backend_origin")]
    pub backend_origin: String,

    #[serde(default = "default_music_path_prefix")]
    pub music_path_prefix: String,

    /// IANA zone the schedule windows are expressed in
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    #[serde(default = "default_scheduler_tick_secs")]
    pub scheduler_tick_secs: u64,

    /// Pause between a scheduled load settling and `play()`
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound on how long a scheduled start waits for its load
    #[serde(default = "default_load_wait_timeout_secs")]
    pub load_wait_timeout_secs: u64,

    /// Position poll period for the embedded video backend
    #[serde(default = "default_position_poll_interval_ms")]
    pub position_poll_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            backend_origin: default_backend_origin(),
            music_path_prefix: default_music_path_prefix(),
            time_zone: default_time_zone(),
            scheduler_tick_secs: default_scheduler_tick_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            load_wait_timeout_secs: default_load_wait_timeout_secs(),
            position_poll_interval_ms: default_position_poll_interval_ms(),
        }
    }
}

impl PlayerConfig {
    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_secs(self.scheduler_tick_secs.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn load_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.load_wait_timeout_secs)
    }

    pub fn position_poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms.max(1))
    }
}

// Default values
fn default_backend_origin() -> String {
    "http://localhost:3001".to_string()
}

fn default_music_path_prefix() -> String {
    "/music/".to_string()
}

fn default_time_zone() -> String {
    "America/Guatemala".to_string()
}

fn default_scheduler_tick_secs() -> u64 {
    60
}

fn default_settle_delay_ms() -> u64 {
    150
}

fn default_load_wait_timeout_secs() -> u64 {
    10
}

fn default_position_poll_interval_ms() -> u64 {
    100
}
