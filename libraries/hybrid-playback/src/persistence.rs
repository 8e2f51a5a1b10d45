//! Durable player preferences
//!
//! Five values survive a restart: loop mode, scheduler on/off, the weekly
//! schedule, and the resume position (index + time). Reads are tolerant:
//! a missing or unparseable value falls back to its default, and the index
//! and time fall back together.

use crate::store::{PlaybackState, PlayerStore};
use hybrid_core::{PreferenceStore, ScheduleConfig};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const KEY_LOOP_MODE: &str = "hybrid-player-loop-mode";
pub const KEY_SCHEDULER_ENABLED: &str = "hybrid-player-scheduler-enabled";
pub const KEY_SCHEDULE_CONFIG: &str = "hybrid-player-schedule-config";
pub const KEY_CURRENT_INDEX: &str = "hybrid-player-current-index";
pub const KEY_CURRENT_TIME: &str = "hybrid-player-current-time";

/// The persisted subset of [`PlaybackState`]
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedPlayer {
    pub loop_mode: bool,
    pub scheduler_enabled: bool,
    pub schedule_config: ScheduleConfig,
    pub current_index: Option<usize>,
    pub current_time: f64,
}

impl Default for PersistedPlayer {
    fn default() -> Self {
        Self {
            loop_mode: false,
            scheduler_enabled: false,
            schedule_config: ScheduleConfig::default(),
            current_index: None,
            current_time: 0.0,
        }
    }
}

impl From<&PlaybackState> for PersistedPlayer {
    fn from(state: &PlaybackState) -> Self {
        Self {
            loop_mode: state.loop_mode,
            scheduler_enabled: state.scheduler_enabled,
            schedule_config: state.schedule_config.clone(),
            current_index: state.current_index,
            current_time: state.current_time,
        }
    }
}

impl PersistedPlayer {
    /// Key/value pairs as written to storage
    ///
    /// No current track is written as index `-1`. A schedule that fails to
    /// serialize is left out so the stored one survives.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let index = self
            .current_index
            .map_or_else(|| "-1".to_string(), |i| i.to_string());

        let mut entries = vec![
            (KEY_LOOP_MODE, self.loop_mode.to_string()),
            (KEY_SCHEDULER_ENABLED, self.scheduler_enabled.to_string()),
        ];
        match serde_json::to_string(&self.schedule_config) {
            Ok(schedule) => entries.push((KEY_SCHEDULE_CONFIG, schedule)),
            Err(e) => warn!(error = %e, "Could not serialize the schedule, keeping the stored one"),
        }
        entries.push((KEY_CURRENT_INDEX, index));
        entries.push((KEY_CURRENT_TIME, self.current_time.to_string()));
        entries
    }
}

/// Read persisted preferences, defaulting anything missing or malformed
pub async fn load_persisted(prefs: &dyn PreferenceStore) -> PersistedPlayer {
    let loop_mode = read(prefs, KEY_LOOP_MODE).await;
    let scheduler_enabled = read(prefs, KEY_SCHEDULER_ENABLED).await;
    let schedule = read(prefs, KEY_SCHEDULE_CONFIG).await;
    let index = read(prefs, KEY_CURRENT_INDEX).await;
    let time = read(prefs, KEY_CURRENT_TIME).await;

    let schedule_config = schedule
        .and_then(|raw| match serde_json::from_str::<ScheduleConfig>(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "Stored schedule is malformed, using default");
                None
            }
        })
        .unwrap_or_default();

    let (current_index, current_time) = parse_position(index.as_deref(), time.as_deref())
        .unwrap_or_else(|| {
            warn!("Stored playback position is malformed, starting from scratch");
            (None, 0.0)
        });

    PersistedPlayer {
        loop_mode: loop_mode.as_deref() == Some("true"),
        scheduler_enabled: scheduler_enabled.as_deref() == Some("true"),
        schedule_config,
        current_index,
        current_time,
    }
}

/// Parse the index/time pair; `None` when either half is unusable
fn parse_position(index: Option<&str>, time: Option<&str>) -> Option<(Option<usize>, f64)> {
    match (index, time) {
        (None, None) => Some((None, 0.0)),
        (Some(index), Some(time)) => {
            let index: i64 = index.trim().parse().ok()?;
            let time: f64 = time.trim().parse().ok()?;
            if !time.is_finite() || time < 0.0 || index < -1 {
                return None;
            }
            let index = usize::try_from(index).ok();
            Some((index, if index.is_some() { time } else { 0.0 }))
        }
        _ => None,
    }
}

async fn read(prefs: &dyn PreferenceStore, key: &str) -> Option<String> {
    match prefs.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Could not read preference");
            None
        }
    }
}

/// Push persisted values into the store
///
/// Call after the playlist is loaded so the resume position can be
/// validated against it.
pub fn apply_persisted(store: &PlayerStore, persisted: &PersistedPlayer) {
    store.set_loop_mode(persisted.loop_mode);
    store.set_schedule_config(persisted.schedule_config.clone());
    store.restore_position(persisted.current_index, persisted.current_time);
    store.set_scheduler_enabled(persisted.scheduler_enabled);
}

/// Write every persisted value
pub async fn save_all(prefs: &dyn PreferenceStore, persisted: &PersistedPlayer) {
    for (key, value) in persisted.entries() {
        write(prefs, key, &value).await;
    }
}

async fn write(prefs: &dyn PreferenceStore, key: &str, value: &str) {
    if let Err(e) = prefs.set(key, value).await {
        warn!(key, error = %e, "Could not persist preference");
    }
}

/// Mirror persisted fields to `prefs` whenever they change
///
/// Only keys whose value differs from the last write are stored. The task
/// ends when the store is dropped.
pub fn spawn_persister(store: &PlayerStore, prefs: Arc<dyn PreferenceStore>) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    let mut last = PersistedPlayer::from(&*rx.borrow_and_update()).entries();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let current = PersistedPlayer::from(&*rx.borrow_and_update()).entries();

            for (key, value) in &current {
                let previous = last.iter().find(|(k, _)| k == key).map(|(_, v)| v);
                if previous != Some(value) {
                    debug!(key, value = %value, "Persisting");
                    write(prefs.as_ref(), key, value).await;
                }
            }

            last = current;
        }
        debug!("Persister stopped");
    })
}
