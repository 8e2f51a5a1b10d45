//! Hybrid Player Server Client
//!
//! HTTP client for the track catalog API the player reads its playlist from.
//!
//! # Features
//!
//! - **Tracks**: list, fetch, create, update and delete catalog entries
//! - **Health**: connectivity check against the API backend
//! - **Catalog trait**: `TracksClient` implements `hybrid_core::TrackCatalog`
//!
//! # Example
//!
//! ```ignore
//! use hybrid_server_client::{ApiConfig, TracksClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TracksClient::new(ApiConfig::new("http://localhost:3001/api"))?;
//!
//!     let health = client.health_check().await?;
//!     println!("API is {} (up {}s)", health.status, health.uptime);
//!
//!     let tracks = client.get_tracks().await?;
//!     println!("Found {} tracks", tracks.len());
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::TracksClient;
pub use error::{Result, ServerClientError};
pub use types::{
    ApiConfig, ApiErrorBody, ClearResponse, EmptyTrashRequest, EmptyTrashResponse, HealthStatus,
    MessageResponse, DEFAULT_API_URL,
};
