//! Wire types for the catalog API.

use serde::{Deserialize, Serialize};

/// API base URL used when none is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// Where the catalog API lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Body of a failed request: `{ "error": "..." }`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Body of a successful delete: `{ "message": "..." }`
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Body of `DELETE /tracks/all/soft`
#[derive(Debug, Clone, Deserialize)]
pub struct ClearResponse {
    /// Tracks moved to the trash
    #[serde(default)]
    pub count: usize,
}

/// Body sent to `DELETE /tracks/trash/cleanup/all`
#[derive(Debug, Clone, Serialize)]
pub struct EmptyTrashRequest {
    #[serde(rename = "olderThan30Days")]
    pub older_than_30_days: bool,
}

/// Body of `DELETE /tracks/trash/cleanup/all`
#[derive(Debug, Clone, Deserialize)]
pub struct EmptyTrashResponse {
    #[serde(rename = "deletedCount", default)]
    pub deleted_count: usize,
}

/// Response of `GET /health`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    /// Seconds since the API process started
    pub uptime: f64,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }

    /// `timestamp` as a UTC time, if it is RFC 3339
    pub fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&chrono::Utc))
    }
}
