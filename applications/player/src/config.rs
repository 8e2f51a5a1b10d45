/// Player application configuration
use crate::error::{AppError, Result};
use hybrid_playback::PlayerConfig;
use hybrid_server_client::{ApiConfig, TracksClient};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix; nested keys are separated by `__`
/// (e.g. `HYBRID_API__BASE_URL`)
pub const ENV_PREFIX: &str = "HYBRID";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `config.toml` in the working directory; a missing
    /// default file is fine, a missing explicit one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Like [`load`](Self::load), reading environment overrides from `env`
    /// instead of the process environment when given
    pub fn load_from(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("config.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with HYBRID_)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config = settings
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(AppError::Config(
                "API base URL is required (set HYBRID_API__BASE_URL)".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "API base URL must use http or https: {base_url}"
            )));
        }

        if !self.storage.database_url.starts_with("sqlite:") {
            return Err(AppError::Config(format!(
                "Only SQLite databases are supported: {}",
                self.storage.database_url
            )));
        }

        if self.player.time_zone.parse::<chrono_tz::Tz>().is_err() {
            return Err(AppError::Config(format!(
                "Unknown time zone: {}",
                self.player.time_zone
            )));
        }

        if self.player.scheduler_tick_secs == 0 {
            return Err(AppError::Config(
                "player.scheduler_tick_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Catalog client for the configured API
    pub fn catalog_client(&self) -> Result<TracksClient> {
        Ok(TracksClient::new(self.api.clone())?)
    }

    /// Directory holding the database file, if the URL names one
    pub fn database_dir(&self) -> Option<PathBuf> {
        let path = self
            .storage
            .database_url
            .trim_start_matches("sqlite:")
            .trim_start_matches("//");
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

// Default values
fn default_database_url() -> String {
    "sqlite://./data/hybrid-player.db".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}
