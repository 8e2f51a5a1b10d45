//! Catalog API client.

use crate::error::{Result, ServerClientError};
use crate::types::{
    ApiConfig, ApiErrorBody, ClearResponse, EmptyTrashRequest, EmptyTrashResponse, HealthStatus,
    MessageResponse,
};
use async_trait::async_trait;
use hybrid_core::{ScanReport, Track, TrackCatalog, UpdateTrack};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the track catalog API.
///
/// Cheap to clone; clones share the connection pool.
///
/// # Example
///
/// ```ignore
/// use hybrid_server_client::{ApiConfig, TracksClient};
///
/// let client = TracksClient::new(ApiConfig::new("http://localhost:3001/api"))?;
/// for track in client.get_tracks().await? {
///     println!("{} - {}", track.artist, track.title);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TracksClient {
    http: Client,
    base_url: String,
}

impl TracksClient {
    /// Create a new client for the API at `config.base_url`.
    pub fn new(config: ApiConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(ServerClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ServerClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("HybridPlayer/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }

    /// The normalized API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of the health endpoint; it lives next to `/api`, not under it.
    fn health_url(&self) -> String {
        if self.base_url.contains("/api") {
            self.base_url.replacen("/api", "/health", 1)
        } else {
            format!("{}/health", self.base_url)
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ServerClientError::ServerUnreachable(e.to_string())
            } else {
                ServerClientError::Request(e)
            }
        })
    }

    /// Decode a success body or turn the `{ error }` body into an error.
    async fn parse<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                ServerClientError::ParseError(format!("Failed to parse {}: {}", what, e))
            });
        }
        Err(Self::error_from(response).await)
    }

    async fn error_from(response: Response) -> ServerClientError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.error)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        ServerClientError::ServerError {
            status: status.as_u16(),
            message,
        }
    }

    /// Map 404 on a single-track endpoint to `NotFound`.
    async fn parse_track(response: Response, id: &str) -> Result<Track> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServerClientError::NotFound(id.to_string()));
        }
        Self::parse(response, "track").await
    }

    /// Get every track in the catalog.
    pub async fn get_tracks(&self) -> Result<Vec<Track>> {
        let url = self.endpoint("/tracks");
        debug!(url = %url, "Fetching tracks");

        let response = Self::send(self.http.get(&url)).await?;
        let tracks: Vec<Track> = Self::parse(response, "track list").await?;

        debug!(count = tracks.len(), "Fetched tracks");
        Ok(tracks)
    }

    /// Get a single track.
    pub async fn get_track(&self, id: &str) -> Result<Track> {
        let url = self.endpoint(&format!("/tracks/{}", id));
        debug!(url = %url, "Fetching track");

        let response = Self::send(self.http.get(&url)).await?;
        Self::parse_track(response, id).await
    }

    /// Create a track; the id is chosen by the caller.
    pub async fn create_track(&self, track: &Track) -> Result<Track> {
        let url = self.endpoint("/tracks");
        debug!(url = %url, track_id = %track.id, "Creating track");

        let response = Self::send(self.http.post(&url).json(track)).await?;
        let created: Track = Self::parse(response, "created track").await?;

        info!(track_id = %created.id, title = %created.title, "Track created");
        Ok(created)
    }

    /// Partially update a track; absent fields are left untouched.
    pub async fn update_track(&self, id: &str, update: &UpdateTrack) -> Result<Track> {
        let url = self.endpoint(&format!("/tracks/{}", id));
        debug!(url = %url, "Updating track");

        let response = Self::send(self.http.put(&url).json(update)).await?;
        Self::parse_track(response, id).await
    }

    /// Move a track to the trash.
    pub async fn delete_track(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/tracks/{}", id));
        debug!(url = %url, "Deleting track");

        let response = Self::send(self.http.delete(&url)).await?;
        let message = Self::parse_message(response, id).await?;
        info!(track_id = id, message = %message, "Track deleted");
        Ok(())
    }

    /// Accept a `{ message }` reply to a single-track action.
    ///
    /// 404 maps to `NotFound`; an empty or odd success body is fine.
    async fn parse_message(response: Response, id: &str) -> Result<String> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServerClientError::NotFound(id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        // Some backends answer 204 without a body
        let text = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str::<MessageResponse>(&text)
            .map(|body| body.message)
            .unwrap_or_default())
    }

    /// Move every track to the trash; returns how many were moved.
    pub async fn clear_tracks(&self) -> Result<usize> {
        let url = self.endpoint("/tracks/all/soft");
        debug!(url = %url, "Clearing playlist");

        let response = Self::send(self.http.delete(&url)).await?;
        let cleared: ClearResponse = Self::parse(response, "clear result").await?;

        info!(count = cleared.count, "Moved all tracks to the trash");
        Ok(cleared.count)
    }

    /// Tracks in the trash, most recently deleted first.
    pub async fn get_trash(&self) -> Result<Vec<Track>> {
        let url = self.endpoint("/tracks/trash/all");
        debug!(url = %url, "Fetching trash");

        let response = Self::send(self.http.get(&url)).await?;
        Self::parse(response, "trash").await
    }

    /// Move a track out of the trash.
    pub async fn restore_track(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/tracks/trash/{}/restore", id));
        debug!(url = %url, "Restoring track");

        let response = Self::send(self.http.post(&url)).await?;
        Self::parse_message(response, id).await?;
        info!(track_id = id, "Track restored");
        Ok(())
    }

    /// Delete a trashed track and its file for good.
    pub async fn delete_track_permanently(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/tracks/trash/{}", id));
        debug!(url = %url, "Deleting track permanently");

        let response = Self::send(self.http.delete(&url)).await?;
        Self::parse_message(response, id).await?;
        info!(track_id = id, "Track permanently deleted");
        Ok(())
    }

    /// Purge the trash; with `older_than_30_days` only entries deleted more
    /// than 30 days ago. Returns how many tracks were purged.
    pub async fn empty_trash(&self, older_than_30_days: bool) -> Result<usize> {
        let url = self.endpoint("/tracks/trash/cleanup/all");
        debug!(url = %url, older_than_30_days, "Emptying trash");

        let body = EmptyTrashRequest { older_than_30_days };
        let response = Self::send(self.http.delete(&url).json(&body)).await?;
        let result: EmptyTrashResponse = Self::parse(response, "cleanup result").await?;

        info!(deleted = result.deleted_count, "Trash emptied");
        Ok(result.deleted_count)
    }

    /// Have the backend add audio files in its music folder that no track
    /// refers to yet.
    pub async fn scan_local_folder(&self) -> Result<ScanReport> {
        let url = self.endpoint("/tracks/scan-local");
        debug!(url = %url, "Scanning local folder");

        let response = Self::send(self.http.post(&url)).await?;
        let report: ScanReport = Self::parse(response, "scan result").await?;

        info!(added = report.added, message = %report.message, "Local folder scanned");
        Ok(report)
    }

    /// Check that the API backend is up.
    pub async fn health_check(&self) -> Result<HealthStatus> {
        let url = self.health_url();
        debug!(url = %url, "Checking API health");

        let response = Self::send(self.http.get(&url)).await?;
        let health: HealthStatus = Self::parse(response, "health status").await?;

        if health.is_ok() {
            info!(uptime = health.uptime, "API is healthy");
        } else {
            warn!(status = %health.status, "API reports a degraded status");
        }
        Ok(health)
    }
}

#[async_trait]
impl TrackCatalog for TracksClient {
    async fn list_tracks(&self) -> hybrid_core::Result<Vec<Track>> {
        Ok(self.get_tracks().await?)
    }

    async fn get_track(&self, id: &str) -> hybrid_core::Result<Track> {
        Ok(TracksClient::get_track(self, id).await?)
    }

    async fn create_track(&self, track: &Track) -> hybrid_core::Result<Track> {
        Ok(TracksClient::create_track(self, track).await?)
    }

    async fn update_track(&self, id: &str, update: &UpdateTrack) -> hybrid_core::Result<Track> {
        Ok(TracksClient::update_track(self, id, update).await?)
    }

    async fn delete_track(&self, id: &str) -> hybrid_core::Result<()> {
        Ok(TracksClient::delete_track(self, id).await?)
    }

    async fn clear_tracks(&self) -> hybrid_core::Result<usize> {
        Ok(TracksClient::clear_tracks(self).await?)
    }

    async fn list_trash(&self) -> hybrid_core::Result<Vec<Track>> {
        Ok(self.get_trash().await?)
    }

    async fn restore_track(&self, id: &str) -> hybrid_core::Result<()> {
        Ok(TracksClient::restore_track(self, id).await?)
    }

    async fn purge_track(&self, id: &str) -> hybrid_core::Result<()> {
        Ok(self.delete_track_permanently(id).await?)
    }

    async fn empty_trash(&self, older_than_30_days: bool) -> hybrid_core::Result<usize> {
        Ok(TracksClient::empty_trash(self, older_than_30_days).await?)
    }

    async fn scan_local(&self) -> hybrid_core::Result<ScanReport> {
        Ok(self.scan_local_folder().await?)
    }
}
