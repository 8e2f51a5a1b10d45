//! Shared player state
//!
//! [`PlayerStore`] is the bus every component communicates through: the
//! adapter writes what backends report, the scheduler reads the schedule and
//! asks for loads, the persister mirrors durable fields to storage. State
//! lives in a `tokio::sync::watch` channel so any task can await changes.
//!
//! All mutation goes through the store's methods, which keep the
//! invariants:
//! - `current_index` is `None` or a valid playlist index
//! - `current_track` is the playlist entry at `current_index`
//! - `volume` is within `0.0..=1.0`

use crate::volume::clamp_volume;
use hybrid_core::{ScanReport, ScheduleConfig, Track, TrackCatalog};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default volume for a fresh store
pub const DEFAULT_VOLUME: f64 = 0.7;

/// Snapshot of the player state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub playlist: Vec<Track>,

    /// Index into `playlist`; `None` means no current track
    pub current_index: Option<usize>,

    /// Always `playlist[current_index]` when set
    pub current_track: Option<Track>,

    pub is_playing: bool,
    pub is_loading: bool,

    /// Linear gain, 0.0-1.0
    pub volume: f64,

    /// Seconds
    pub current_time: f64,
    /// Seconds
    pub duration: f64,

    /// Wrap to the first track after the last one
    pub loop_mode: bool,

    pub scheduler_enabled: bool,
    pub schedule_config: ScheduleConfig,

    /// Bumped whenever someone asks for the current track to be loaded
    pub load_request: u64,

    /// Highest `load_request` whose load attempt has finished
    pub load_settled: u64,

    /// Catalog trash as last fetched
    pub trash: Vec<Track>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            playlist: Vec::new(),
            current_index: None,
            current_track: None,
            is_playing: false,
            is_loading: false,
            volume: DEFAULT_VOLUME,
            current_time: 0.0,
            duration: 0.0,
            loop_mode: false,
            scheduler_enabled: false,
            schedule_config: ScheduleConfig::default(),
            load_request: 0,
            load_settled: 0,
            trash: Vec::new(),
        }
    }
}

impl PlaybackState {
    /// Whether advancing would land on a track without wrapping
    pub fn has_next_track(&self) -> bool {
        match self.current_index {
            Some(index) => index + 1 < self.playlist.len(),
            None => !self.playlist.is_empty(),
        }
    }

    pub fn has_previous_track(&self) -> bool {
        self.current_index.is_some_and(|index| index > 0)
    }

    /// Playback progress in percent, 0 when the duration is unknown
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            self.current_time / self.duration * 100.0
        } else {
            0.0
        }
    }

    /// Whether a requested load has not finished yet
    pub fn load_pending(&self) -> bool {
        self.load_settled < self.load_request
    }

    fn select(&mut self, index: Option<usize>) -> Option<Track> {
        let track = index.and_then(|i| self.playlist.get(i).cloned());
        self.current_index = if track.is_some() { index } else { None };
        self.current_track.clone_from(&track);
        track
    }
}

/// Handle to the shared player state
///
/// Cheap to clone; all clones see the same state.
#[derive(Debug, Clone)]
pub struct PlayerStore {
    state: Arc<watch::Sender<PlaybackState>>,
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::with_state(PlaybackState::default())
    }

    /// Create a store from an initial state
    ///
    /// The state is normalized: an out-of-range index is cleared and the
    /// volume clamped.
    pub fn with_state(mut initial: PlaybackState) -> Self {
        initial.volume = clamp_volume(initial.volume);
        let index = initial.current_index;
        initial.select(index);

        let (tx, _rx) = watch::channel(initial);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    /// Read the current state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&PlaybackState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut PlaybackState) -> bool) -> bool {
        self.state.send_if_modified(f)
    }

    // ===== Playlist =====

    /// Replace the playlist
    ///
    /// The current index is kept when still in range; the current track is
    /// refreshed from the new playlist.
    pub fn set_playlist(&self, tracks: Vec<Track>) {
        self.update(|s| {
            s.playlist = tracks;
            let index = s.current_index;
            s.select(index);
            true
        });
    }

    /// Fetch the playlist from the catalog
    ///
    /// # Errors
    ///
    /// Returns the catalog error; the playlist is left untouched.
    pub async fn load_tracks(&self, catalog: &dyn TrackCatalog) -> hybrid_core::Result<usize> {
        let tracks = catalog.list_tracks().await?;
        let count = tracks.len();
        info!(count, "Loaded tracks from catalog");
        self.set_playlist(tracks);
        Ok(count)
    }

    /// Create `track` in the catalog, then append what the catalog returned
    pub async fn add_track(
        &self,
        catalog: &dyn TrackCatalog,
        track: &Track,
    ) -> hybrid_core::Result<Track> {
        let created = catalog.create_track(track).await?;
        debug!(track_id = %created.id, "Track added");
        let appended = created.clone();
        self.update(move |s| {
            s.playlist.push(appended);
            true
        });
        Ok(created)
    }

    /// Delete a track from the catalog and the playlist
    ///
    /// Removing the current track clears the selection; removing an earlier
    /// track shifts the current index down. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns the catalog error; the playlist is left untouched.
    pub async fn remove_track(
        &self,
        catalog: &dyn TrackCatalog,
        track_id: &str,
    ) -> hybrid_core::Result<bool> {
        let found = self.read(|s| s.playlist.iter().any(|t| t.id == track_id));
        if !found {
            return Ok(false);
        }

        catalog.delete_track(track_id).await?;

        let removed = self.update(|s| {
            let Some(index) = s.playlist.iter().position(|t| t.id == track_id) else {
                return false;
            };
            s.playlist.remove(index);
            match s.current_index {
                Some(current) if current == index => {
                    s.current_index = None;
                    s.current_track = None;
                }
                Some(current) if index < current => s.current_index = Some(current - 1),
                _ => {}
            }
            true
        });

        debug!(track_id, removed, "Track removed");
        Ok(removed)
    }

    /// Move every track to the catalog trash and empty the playlist
    ///
    /// Clears the selection and marks playback stopped; releasing the
    /// backend is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns the catalog error; the playlist is left untouched.
    pub async fn clear_playlist(&self, catalog: &dyn TrackCatalog) -> hybrid_core::Result<usize> {
        let count = catalog.clear_tracks().await?;
        self.update(|s| {
            s.playlist.clear();
            s.current_index = None;
            s.current_track = None;
            s.is_playing = false;
            true
        });
        info!(count, "Playlist cleared");
        Ok(count)
    }

    // ===== Trash =====

    /// Fetch the catalog trash into `trash`
    pub async fn load_trash(&self, catalog: &dyn TrackCatalog) -> hybrid_core::Result<usize> {
        let trash = catalog.list_trash().await?;
        let count = trash.len();
        self.update(|s| replace(&mut s.trash, trash));
        Ok(count)
    }

    async fn refresh_trash(&self, catalog: &dyn TrackCatalog) {
        if let Err(e) = self.load_trash(catalog).await {
            warn!(error = %e, "Could not refresh the trash");
        }
    }

    /// Bring a track back from the trash, then reload trash and playlist
    pub async fn restore_track(
        &self,
        catalog: &dyn TrackCatalog,
        track_id: &str,
    ) -> hybrid_core::Result<()> {
        catalog.restore_track(track_id).await?;
        self.refresh_trash(catalog).await;
        self.load_tracks(catalog).await?;
        debug!(track_id, "Track restored");
        Ok(())
    }

    /// Delete a trashed track for good
    pub async fn delete_track_permanently(
        &self,
        catalog: &dyn TrackCatalog,
        track_id: &str,
    ) -> hybrid_core::Result<()> {
        catalog.purge_track(track_id).await?;
        self.refresh_trash(catalog).await;
        Ok(())
    }

    /// Purge the trash, optionally only entries older than 30 days
    pub async fn empty_trash(
        &self,
        catalog: &dyn TrackCatalog,
        older_than_30_days: bool,
    ) -> hybrid_core::Result<usize> {
        let purged = catalog.empty_trash(older_than_30_days).await?;
        self.refresh_trash(catalog).await;
        info!(purged, older_than_30_days, "Trash emptied");
        Ok(purged)
    }

    /// Ask the catalog to pick up files from its music folder and reload
    /// the playlist when it found any
    pub async fn scan_local_folder(
        &self,
        catalog: &dyn TrackCatalog,
    ) -> hybrid_core::Result<ScanReport> {
        let report = catalog.scan_local().await?;
        if report.added > 0 {
            self.load_tracks(catalog).await?;
        }
        Ok(report)
    }

    // ===== Navigation =====

    /// Make `index` current; out-of-range indices change nothing
    pub fn play_track_at_index(&self, index: usize) -> Option<Track> {
        let mut selected = None;
        self.update(|s| {
            if index >= s.playlist.len() {
                return false;
            }
            selected = s.select(Some(index));
            true
        });
        selected
    }

    /// Advance to the next track, wrapping to the first in loop mode
    pub fn next_track(&self) -> Option<Track> {
        let mut selected = None;
        self.update(|s| {
            let next = if s.has_next_track() {
                s.current_index.map_or(0, |i| i + 1)
            } else if s.loop_mode && !s.playlist.is_empty() {
                0
            } else {
                return false;
            };
            selected = s.select(Some(next));
            true
        });
        selected
    }

    /// Go back one track; never wraps
    pub fn previous_track(&self) -> Option<Track> {
        let mut selected = None;
        self.update(|s| {
            let Some(index) = s.current_index.filter(|&i| i > 0) else {
                return false;
            };
            selected = s.select(Some(index - 1));
            true
        });
        selected
    }

    pub fn has_next_track(&self) -> bool {
        self.read(PlaybackState::has_next_track)
    }

    pub fn has_previous_track(&self) -> bool {
        self.read(PlaybackState::has_previous_track)
    }

    pub fn progress(&self) -> f64 {
        self.read(PlaybackState::progress)
    }

    // ===== Load coordination =====

    /// Ask for the current track to be loaded
    ///
    /// Returns the request id; the adapter's store follower settles it with
    /// [`PlayerStore::mark_load_settled`] once the attempt finished.
    pub fn request_load(&self) -> u64 {
        let mut id = 0;
        self.update(|s| {
            s.load_request += 1;
            id = s.load_request;
            true
        });
        debug!(request = id, "Load requested");
        id
    }

    /// Record that load request `id` finished (successfully or not)
    pub fn mark_load_settled(&self, id: u64) {
        self.update(|s| {
            if id <= s.load_settled {
                return false;
            }
            s.load_settled = id;
            true
        });
    }

    /// Restore a persisted resume position
    ///
    /// `index` and `time` are a pair: when `index` is not valid for the
    /// current playlist both are discarded.
    pub fn restore_position(&self, index: Option<usize>, time: f64) {
        self.update(|s| {
            let selected = s.select(index);
            s.current_time = if selected.is_some() && time.is_finite() && time > 0.0 {
                time
            } else {
                0.0
            };
            if index.is_some() && selected.is_none() {
                warn!(?index, "Discarding persisted position outside the playlist");
            }
            true
        });
    }

    // ===== Setters =====

    pub fn set_playing(&self, playing: bool) {
        self.update(|s| replace(&mut s.is_playing, playing));
    }

    pub fn set_loading(&self, loading: bool) {
        self.update(|s| replace(&mut s.is_loading, loading));
    }

    /// Set the volume, clamped into `0.0..=1.0`
    pub fn set_volume(&self, volume: f64) -> f64 {
        let volume = clamp_volume(volume);
        self.update(|s| replace(&mut s.volume, volume));
        volume
    }

    pub fn set_current_time(&self, time: f64) {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        self.update(|s| replace(&mut s.current_time, time));
    }

    pub fn set_duration(&self, duration: f64) {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        self.update(|s| replace(&mut s.duration, duration));
    }

    pub fn set_loop_mode(&self, enabled: bool) {
        self.update(|s| replace(&mut s.loop_mode, enabled));
    }

    /// Flip loop mode, returning the new value
    pub fn toggle_loop_mode(&self) -> bool {
        let mut now = false;
        self.update(|s| {
            s.loop_mode = !s.loop_mode;
            now = s.loop_mode;
            true
        });
        now
    }

    pub fn set_scheduler_enabled(&self, enabled: bool) {
        self.update(|s| replace(&mut s.scheduler_enabled, enabled));
    }

    pub fn set_schedule_config(&self, config: ScheduleConfig) {
        for (name, window) in [("weekdays", &config.weekdays), ("weekends", &config.weekends)] {
            if !window.is_well_formed() {
                warn!(
                    window = name,
                    start = %window.start,
                    end = %window.end,
                    "Schedule window is empty or inverted and will never match"
                );
            }
        }
        self.update(|s| replace(&mut s.schedule_config, config));
    }
}

/// Assign and report whether the value changed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
