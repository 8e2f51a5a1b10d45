/// Core traits for Hybrid Player
use crate::error::Result;
use crate::types::{ScanReport, Track, UpdateTrack};
use async_trait::async_trait;

/// The external track catalog (the CRUD API)
///
/// The playlist is populated from `list_tracks` at startup; additions and
/// removals made through the player store go through here first so the
/// catalog stays the source of truth.
///
/// Deleting is soft: deleted tracks sit in the trash until restored or
/// purged.
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Get all tracks in playback order
    async fn list_tracks(&self) -> Result<Vec<Track>>;

    /// Get a single track
    async fn get_track(&self, id: &str) -> Result<Track>;

    /// Create a track; the caller supplies the id
    async fn create_track(&self, track: &Track) -> Result<Track>;

    /// Partially update a track
    async fn update_track(&self, id: &str, update: &UpdateTrack) -> Result<Track>;

    /// Move a track to the trash
    async fn delete_track(&self, id: &str) -> Result<()>;

    /// Move every track to the trash, returning how many were moved
    async fn clear_tracks(&self) -> Result<usize>;

    /// Tracks in the trash, most recently deleted first
    async fn list_trash(&self) -> Result<Vec<Track>>;

    /// Move a track from the trash back into the catalog
    async fn restore_track(&self, id: &str) -> Result<()>;

    /// Delete a trashed track for good
    async fn purge_track(&self, id: &str) -> Result<()>;

    /// Purge the whole trash, or only what was deleted more than 30 days
    /// ago; returns how many tracks were purged
    async fn empty_trash(&self, older_than_30_days: bool) -> Result<usize>;

    /// Have the catalog pick up audio files in its music folder that it
    /// does not know yet
    async fn scan_local(&self) -> Result<ScanReport>;
}

/// Durable key/value preference storage
///
/// Values are opaque strings. Readers must tolerate a missing key (first run)
/// as well as content they cannot parse.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Read a value, `None` when the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write (insert or replace) a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; deleting a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}
