//! In-memory preference store and track catalog
//!
//! Used by tests and by hosts that do not need preferences to survive a
//! restart or have no catalog API to talk to.

use crate::error::{HybridError, Result};
use crate::traits::{PreferenceStore, TrackCatalog};
use crate::types::{ScanReport, Track, UpdateTrack};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Trash entries older than this are purged by `empty_trash(true)`
const TRASH_RETENTION_DAYS: i64 = 30;

/// `PreferenceStore` backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.values.lock().await.len()
    }

    /// Whether nothing has been stored
    pub async fn is_empty(&self) -> bool {
        self.values.lock().await.is_empty()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    tracks: Vec<Track>,
    trash: Vec<(Track, DateTime<Utc>)>,
    /// Files in the music folder the catalog has not picked up yet
    unscanned: Vec<Track>,
}

/// `TrackCatalog` backed by a `Vec`, with a trash that behaves like the API's
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

impl MemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding `tracks`
    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            state: Mutex::new(CatalogState {
                tracks,
                ..CatalogState::default()
            }),
        }
    }

    /// Tracks outside the trash
    pub async fn tracks(&self) -> Vec<Track> {
        self.state.lock().await.tracks.clone()
    }

    /// Put `track` straight into the trash as if deleted at `deleted_at`
    pub async fn trash_at(&self, track: Track, deleted_at: DateTime<Utc>) {
        self.state.lock().await.trash.push((track, deleted_at));
    }

    /// Drop `track` into the music folder for the next `scan_local`
    pub async fn stage_local(&self, track: Track) {
        self.state.lock().await.unscanned.push(track);
    }
}

fn apply_update(track: &mut Track, update: &UpdateTrack) {
    if let Some(title) = &update.title {
        track.title.clone_from(title);
    }
    if let Some(artist) = &update.artist {
        track.artist.clone_from(artist);
    }
    if let Some(track_type) = update.track_type {
        track.track_type = track_type;
    }
    if let Some(src) = &update.src {
        track.src.clone_from(src);
    }
    if update.cover.is_some() {
        track.cover.clone_from(&update.cover);
    }
    if update.duration.is_some() {
        track.duration = update.duration;
    }
}

#[async_trait]
impl TrackCatalog for MemoryCatalog {
    async fn list_tracks(&self) -> Result<Vec<Track>> {
        Ok(self.tracks().await)
    }

    async fn get_track(&self, id: &str) -> Result<Track> {
        self.state
            .lock()
            .await
            .tracks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| HybridError::not_found("Track", id))
    }

    async fn create_track(&self, track: &Track) -> Result<Track> {
        let mut state = self.state.lock().await;
        if state.tracks.iter().any(|t| t.id == track.id) {
            return Err(HybridError::invalid_input(format!(
                "track {} already exists",
                track.id
            )));
        }
        state.tracks.push(track.clone());
        Ok(track.clone())
    }

    async fn update_track(&self, id: &str, update: &UpdateTrack) -> Result<Track> {
        let mut state = self.state.lock().await;
        let track = state
            .tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| HybridError::not_found("Track", id))?;
        apply_update(track, update);
        Ok(track.clone())
    }

    async fn delete_track(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let index = state
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| HybridError::not_found("Track", id))?;
        let track = state.tracks.remove(index);
        state.trash.push((track, Utc::now()));
        Ok(())
    }

    async fn clear_tracks(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let cleared: Vec<_> = state.tracks.drain(..).map(|t| (t, now)).collect();
        let count = cleared.len();
        state.trash.extend(cleared);
        Ok(count)
    }

    async fn list_trash(&self) -> Result<Vec<Track>> {
        let mut trash = self.state.lock().await.trash.clone();
        trash.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(trash.into_iter().map(|(track, _)| track).collect())
    }

    async fn restore_track(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let index = state
            .trash
            .iter()
            .position(|(t, _)| t.id == id)
            .ok_or_else(|| HybridError::not_found("Track", id))?;
        let (track, _) = state.trash.remove(index);
        state.tracks.push(track);
        Ok(())
    }

    async fn purge_track(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let before = state.trash.len();
        state.trash.retain(|(t, _)| t.id != id);
        if state.trash.len() == before {
            return Err(HybridError::not_found("Track", id));
        }
        Ok(())
    }

    async fn empty_trash(&self, older_than_30_days: bool) -> Result<usize> {
        let mut state = self.state.lock().await;
        let before = state.trash.len();
        if older_than_30_days {
            let cutoff = Utc::now() - Duration::days(TRASH_RETENTION_DAYS);
            state.trash.retain(|(_, deleted_at)| *deleted_at >= cutoff);
        } else {
            state.trash.clear();
        }
        Ok(before - state.trash.len())
    }

    async fn scan_local(&self) -> Result<ScanReport> {
        let mut state = self.state.lock().await;
        let found = std::mem::take(&mut state.unscanned);
        let added = found.len();
        state.tracks.extend(found);
        Ok(ScanReport {
            added,
            message: format!("Scanned local folder. Recovered {added} orphaned tracks."),
        })
    }
}
