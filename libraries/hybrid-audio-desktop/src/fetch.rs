//! Reading a resolved locator into memory

use crate::error::{AudioError, Result};
use reqwest::Client;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Raw file contents plus an extension hint for the decoder
#[derive(Debug)]
pub struct FetchedAudio {
    pub bytes: Vec<u8>,
    pub extension: Option<String>,
}

fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Fetch `locator`: an http(s) URL, a `file://` URL, or a plain path
pub async fn fetch(http: &Client, locator: &str) -> Result<FetchedAudio> {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        let url = Url::parse(locator).map_err(|e| AudioError::Fetch(e.to_string()))?;
        debug!(url = %url, "Downloading audio");

        let response = http.get(url.clone()).send().await?.error_for_status()?;
        let bytes = response.bytes().await?.to_vec();

        debug!(url = %url, bytes = bytes.len(), "Downloaded audio");
        return Ok(FetchedAudio {
            bytes,
            extension: extension_of(url.path()),
        });
    }

    let path = if locator.starts_with("file://") {
        Url::parse(locator)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| AudioError::Fetch(format!("not a local file URL: {}", locator)))?
    } else {
        Path::new(locator).to_path_buf()
    };

    debug!(path = %path.display(), "Reading audio file");
    let bytes = tokio::fs::read(&path).await?;
    Ok(FetchedAudio {
        extension: path.to_str().and_then(extension_of),
        bytes,
    })
}
