//! Source resolution
//!
//! Turns a [`Track`] into something a backend can open. Each track type has
//! its own `src` convention:
//!
//! | type | backend | resolved to |
//! |---|---|---|
//! | `mp3` | native | `src` unchanged |
//! | `local` | native | `src` joined to the backend origin when it starts with the music prefix |
//! | `drive` | native | direct download URL built from the file id |
//! | `dropbox` | native | share link forced to `dl=1` |
//! | `youtube` | embedded | 11-character video id |

use crate::backend::BackendKind;
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use hybrid_core::{Track, TrackType};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*((youtu.be/)|(v/)|(/u/\w/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*")
        .expect("youtube id pattern compiles")
});

static DRIVE_FILE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/file/d/([^/?#]+)").expect("drive path pattern compiles")
});

static DRIVE_ID_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]id=([^&#]+)").expect("drive id pattern compiles")
});

static DRIVE_UC_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/uc\?.*id=([^&#]+)").expect("drive uc pattern compiles")
});

const YOUTUBE_ID_LEN: usize = 11;

/// Cross-origin credentials mode for native loads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsMode {
    /// Request without credentials, the default
    Anonymous,
    /// No cross-origin mode at all; used as the Drive fallback
    Disabled,
}

/// A resolved, backend-ready source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// URL (or local path) for the native audio backend
    Native { url: String, cors: CorsMode },
    /// Video id for the embedded video backend
    Embedded { video_id: String },
}

impl MediaSource {
    /// Backend family that can play this source
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Native { .. } => BackendKind::NativeAudio,
            Self::Embedded { .. } => BackendKind::EmbeddedVideo,
        }
    }

    /// Same source with a different cross-origin mode
    ///
    /// Embedded sources are returned unchanged.
    #[must_use]
    pub fn with_cors(self, mode: CorsMode) -> Self {
        match self {
            Self::Native { url, .. } => Self::Native { url, cors: mode },
            other @ Self::Embedded { .. } => other,
        }
    }

    /// Human-readable locator for logging
    pub fn locator(&self) -> &str {
        match self {
            Self::Native { url, .. } => url,
            Self::Embedded { video_id } => video_id,
        }
    }
}

/// Backend family for a track type
pub fn backend_for(track_type: TrackType) -> BackendKind {
    match track_type {
        TrackType::Youtube => BackendKind::EmbeddedVideo,
        TrackType::Mp3 | TrackType::Local | TrackType::Drive | TrackType::Dropbox => {
            BackendKind::NativeAudio
        }
    }
}

/// Resolve `track` into a source for its backend
///
/// # Errors
///
/// `PlaybackError::SourceResolution` when the `src` is empty, a YouTube or
/// Drive link carries no recognizable id, or a `local` path cannot be
/// joined to the backend origin.
pub fn resolve(track: &Track, config: &PlayerConfig) -> Result<MediaSource> {
    let src = track.src.trim();
    if src.is_empty() {
        return Err(PlaybackError::source(format!(
            "track {} has an empty src",
            track.id
        )));
    }

    let native = |url: String| MediaSource::Native {
        url,
        cors: CorsMode::Anonymous,
    };

    match track.track_type {
        TrackType::Mp3 => Ok(native(src.to_string())),
        TrackType::Local => local_url(src, config).map(native),
        TrackType::Drive => {
            let id = extract_drive_file_id(src).ok_or_else(|| {
                PlaybackError::source("could not extract file id from Google Drive URL")
            })?;
            Ok(native(drive_stream_url(&id)))
        }
        TrackType::Dropbox => Ok(native(dropbox_direct_url(src))),
        TrackType::Youtube => {
            let video_id = extract_youtube_id(src)
                .ok_or_else(|| PlaybackError::source("invalid YouTube URL"))?;
            Ok(MediaSource::Embedded { video_id })
        }
    }
}

/// Extract the 11-character video id from a YouTube URL
///
/// Accepts `youtu.be/ID`, `/v/ID`, `/u/x/ID`, `/embed/ID` and `watch?v=ID`.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    let captures = YOUTUBE_ID.captures(url)?;
    let id = captures.get(7)?.as_str();
    (id.len() == YOUTUBE_ID_LEN).then(|| id.to_string())
}

/// Extract the file id from a Google Drive share link
///
/// Tried in order: `/file/d/ID`, `?id=ID` / `&id=ID`, `/uc?...id=ID`.
pub fn extract_drive_file_id(url: &str) -> Option<String> {
    [&*DRIVE_FILE_PATH, &*DRIVE_ID_PARAM, &*DRIVE_UC_PARAM]
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Direct download URL for a Drive file id
pub fn drive_stream_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={file_id}&confirm=t")
}

/// Rewrite a Dropbox share link so it serves the raw file
///
/// `dl=0` becomes `dl=1`; a link without any `dl` parameter gets `dl=1`
/// appended.
pub fn dropbox_direct_url(url: &str) -> String {
    let direct = url.replacen("?dl=0", "?dl=1", 1).replacen("&dl=0", "&dl=1", 1);

    if direct.contains("?dl=") || direct.contains("&dl=") {
        direct
    } else if direct.contains('?') {
        format!("{direct}&dl=1")
    } else {
        format!("{direct}?dl=1")
    }
}

/// Prefix a backend-served path with the backend origin
///
/// The path is appended verbatim, so an origin with a path of its own (a
/// backend behind a reverse proxy) keeps it.
fn local_url(src: &str, config: &PlayerConfig) -> Result<String> {
    if !src.starts_with(&config.music_path_prefix) {
        return Ok(src.to_string());
    }

    Url::parse(&config.backend_origin).map_err(|e| {
        PlaybackError::source(format!(
            "invalid backend origin {:?}: {e}",
            config.backend_origin
        ))
    })?;

    Ok(format!(
        "{}{src}",
        config.backend_origin.trim_end_matches('/')
    ))
}
