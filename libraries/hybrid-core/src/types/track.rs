/// Track domain type
use crate::types::TrackId;
use serde::{Deserialize, Serialize};

/// Where a track's `src` points to
///
/// The set is closed; the playback layer picks its backend from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    /// Direct audio URL
    Mp3,
    /// YouTube watch/share/embed URL
    Youtube,
    /// Google Drive share link
    Drive,
    /// Dropbox share link
    Dropbox,
    /// File served by the API backend (usually under `/music/`)
    Local,
}

impl TrackType {
    /// All variants, in declaration order
    pub const ALL: [TrackType; 5] = [
        Self::Mp3,
        Self::Youtube,
        Self::Drive,
        Self::Dropbox,
        Self::Local,
    ];

    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Youtube => "youtube",
            Self::Drive => "drive",
            Self::Dropbox => "dropbox",
            Self::Local => "local",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mp3" => Some(Self::Mp3),
            "youtube" => Some(Self::Youtube),
            "drive" => Some(Self::Drive),
            "dropbox" => Some(Self::Dropbox),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A playable track as served by the catalog API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Artist name
    #[serde(default)]
    pub artist: String,

    /// Source family
    #[serde(rename = "type")]
    pub track_type: TrackType,

    /// Locator; its meaning depends on `track_type`
    pub src: String,

    /// Cover art URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,

    /// Duration in seconds, when the catalog knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Track {
    /// Create a new track with a generated id
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        track_type: TrackType,
        src: impl Into<String>,
    ) -> Self {
        Self {
            id: TrackId::generate(),
            title: title.into(),
            artist: artist.into(),
            track_type,
            src: src.into(),
            cover: None,
            duration: None,
        }
    }

    /// Replace the generated id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = TrackId::new(id);
        self
    }

    /// Set the cover URL
    #[must_use]
    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }
}

/// Partial update for `PUT /tracks/{id}`
///
/// `None` fields are left out of the body and keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTrack {
    /// New title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New artist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// New source type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub track_type: Option<TrackType>,
    /// New locator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// New cover URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// New duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl UpdateTrack {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.track_type.is_none()
            && self.src.is_none()
            && self.cover.is_none()
            && self.duration.is_none()
    }
}

/// Result of asking the catalog to pick up files in its music folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Tracks added to the catalog
    #[serde(default)]
    pub added: usize,
    /// Summary from the catalog
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_type_string_forms() {
        for ty in TrackType::ALL {
            assert_eq!(TrackType::from_str(ty.as_str()), Some(ty));
            assert_eq!(ty.to_string(), ty.as_str());
        }
        assert_eq!(TrackType::from_str("flac"), None);
        assert_eq!(TrackType::from_str("MP3"), None);
    }

    #[test]
    fn track_deserializes_from_api_json() {
        let json = r#"{
            "id": "7",
            "title": "Song",
            "artist": "Band",
            "type": "youtube",
            "src": "https://youtu.be/dQw4w9WgXcQ",
            "duration": 212.5
        }"#;

        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.id, "7");
        assert_eq!(track.track_type, TrackType::Youtube);
        assert_eq!(track.duration, Some(212.5));
        assert_eq!(track.cover, None);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = r#"{"id":"1","title":"t","artist":"a","type":"vinyl","src":"x"}"#;
        assert!(serde_json::from_str::<Track>(json).is_err());
    }

    #[test]
    fn track_serializes_type_field() {
        let track = Track::new("t", "a", TrackType::Local, "/music/a.mp3").with_id("9");
        let value = serde_json::to_value(&track).unwrap();
        assert_eq!(value["type"], "local");
        assert_eq!(value["id"], "9");
        assert!(value.get("cover").is_none());
    }

    #[test]
    fn update_track_omits_absent_fields() {
        let update = UpdateTrack {
            title: Some("New".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"title":"New"}"#
        );
        assert!(UpdateTrack::default().is_empty());
    }
}
