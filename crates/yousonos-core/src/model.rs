//! Server-owned entities mirrored by the client.
//!
//! These types match the JSON payloads pushed by the player server, so field
//! names follow the wire format rather than Rust conventions where the two differ.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Source of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    /// A track streamed from `YouTube`.
    #[default]
    Youtube,
    /// Sentinel for "nothing loaded".
    Null,
}

/// Playback status carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrackStatus {
    /// The track is playing.
    Playing,
    /// The track is paused.
    Paused,
    /// The track is stopped.
    #[default]
    Stopped,
}

/// A playable item. The url is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Track title.
    #[serde(default)]
    pub title: String,
    /// Performing artist.
    #[serde(default)]
    pub artist: String,
    /// Uploader of the track.
    #[serde(default)]
    pub author: String,
    /// Track url, unique within a playlist or a search query.
    pub url: String,
    /// Cover image url.
    #[serde(default)]
    pub cover_url: String,
    /// Source of the track.
    #[serde(default)]
    pub track_type: TrackType,
    /// Playback status of the track.
    #[serde(default)]
    pub track_status: TrackStatus,
    /// Duration in milliseconds.
    #[serde(default)]
    pub duration: u64,
}

impl Track {
    /// Create a `YouTube` track with the given url and title.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: String::new(),
            author: String::new(),
            url: url.into(),
            cover_url: String::new(),
            track_type: TrackType::Youtube,
            track_status: TrackStatus::Stopped,
            duration: 0,
        }
    }

    /// The sentinel track pushed when nothing is loaded.
    #[must_use]
    pub fn null() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            author: String::new(),
            url: String::new(),
            cover_url: String::new(),
            track_type: TrackType::Null,
            track_status: TrackStatus::Stopped,
            duration: 0,
        }
    }

    /// Whether this is the "nothing loaded" sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.track_type == TrackType::Null
    }

    /// Set the duration in milliseconds.
    #[must_use]
    pub const fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    /// Set the playback status.
    #[must_use]
    pub const fn with_status(mut self, status: TrackStatus) -> Self {
        self.track_status = status;
        self
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            return write!(f, "<no track>");
        }
        if self.artist.is_empty() {
            write!(f, "{} ({})", self.title, self.url)
        } else {
            write!(f, "{} - {} ({})", self.artist, self.title, self.url)
        }
    }
}

/// Position of an entry relative to playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlaylistEntryStatus {
    /// Not played yet.
    Waiting,
    /// The entry being played. At most one entry is current.
    Current,
    /// Already played.
    Completed,
}

/// One slot in the server playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Entry identity, unique within a playlist snapshot.
    pub playlist_entry_id: String,
    /// The track in this slot.
    pub track: Track,
    /// Playback position of this entry.
    pub status: PlaylistEntryStatus,
}

impl PlaylistEntry {
    /// Create a waiting entry.
    pub fn new(id: impl Into<String>, track: Track) -> Self {
        Self {
            playlist_entry_id: id.into(),
            track,
            status: PlaylistEntryStatus::Waiting,
        }
    }

    /// Set the entry status.
    #[must_use]
    pub const fn with_status(mut self, status: PlaylistEntryStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether this entry is the one being played.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.status == PlaylistEntryStatus::Current
    }
}

/// One controllable output device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device name, its identity.
    pub device_name: String,
    /// Current volume, between 0 and `max_volume`.
    pub current_volume: u32,
    /// Highest volume the device accepts.
    pub max_volume: u32,
}

impl Device {
    /// Create a device description.
    pub fn new(name: impl Into<String>, current_volume: u32, max_volume: u32) -> Self {
        Self {
            device_name: name.into(),
            current_volume,
            max_volume,
        }
    }

    /// Clamp a requested volume into `[0, max_volume]`.
    #[must_use]
    pub fn clamp_volume(&self, requested: i64) -> u32 {
        requested.clamp(0, i64::from(self.max_volume)) as u32
    }
}

/// Player status as reported on the `player_state` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerState {
    /// Audio is playing.
    Playing,
    /// Playback is paused.
    Paused,
    /// Nothing is playing.
    #[default]
    Stopped,
}

impl PlayerState {
    /// Parse the raw value of a `player_state` push.
    ///
    /// Anything outside the declared enum is a contract violation.
    pub fn from_raw(raw: &str) -> Result<Self> {
        match raw {
            "PLAYING" => Ok(Self::Playing),
            "PAUSED" => Ok(Self::Paused),
            "STOPPED" => Ok(Self::Stopped),
            other => Err(Error::IllegalPlayerState(other.to_string())),
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playing => write!(f, "PLAYING"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// A track at a fixed position of a search result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultTrack {
    /// Result index, unique within the whole query.
    pub index: u32,
    /// The found track.
    pub track: Track,
}

impl SearchResultTrack {
    /// Pair a track with its result index.
    pub const fn new(index: u32, track: Track) -> Self {
        Self { index, track }
    }
}

/// One page of indexed results for a query, as pushed on `search_results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultBatch {
    /// The query these results belong to.
    pub search_string: String,
    /// The server found no further results for the query.
    #[serde(default)]
    pub search_completed: bool,
    /// The server hit an error while searching.
    #[serde(default)]
    pub has_error: bool,
    /// Batch this page answers.
    pub batch_index: u32,
    /// No further pages will arrive for this batch.
    #[serde(default)]
    pub batch_completed: bool,
    /// Results of this page.
    #[serde(default)]
    pub results: Vec<SearchResultTrack>,
}

/// Format a duration in milliseconds as `h:mm:ss`, omitting hours when zero.
#[must_use]
pub fn format_duration(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_track_deserialization_from_server_payload() {
        let json = r#"{
            "title": "Song",
            "artist": "Band",
            "author": "Channel",
            "url": "https://youtube.com/watch?v=abc",
            "cover_url": "https://img/abc.jpg",
            "track_type": "youtube",
            "track_status": "PLAYING",
            "duration": 215000
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.title, "Song");
        assert_eq!(track.track_status, TrackStatus::Playing);
        assert_eq!(track.duration, 215_000);
        assert!(!track.is_null());
    }

    #[test]
    fn test_null_track_sentinel() {
        let json = r#"{"url": "", "track_type": "null"}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert!(track.is_null());
        assert_eq!(track, Track::null());
        assert_eq!(track.to_string(), "<no track>");
    }

    #[test]
    fn test_unknown_track_status_is_rejected() {
        let json = r#"{"url": "u", "track_status": "REWINDING"}"#;
        assert!(serde_json::from_str::<Track>(json).is_err());
    }

    #[test]
    fn test_playlist_entry_status_wire_format() {
        let entry = PlaylistEntry::new("e1", Track::new("u1", "One"))
            .with_status(PlaylistEntryStatus::Current);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "CURRENT");
        assert_eq!(json["playlist_entry_id"], "e1");
        assert!(entry.is_current());
    }

    #[test]
    fn test_device_clamp_volume() {
        let device = Device::new("Kitchen", 20, 80);
        assert_eq!(device.clamp_volume(-5), 0);
        assert_eq!(device.clamp_volume(40), 40);
        assert_eq!(device.clamp_volume(180), 80);
    }

    #[test]
    fn test_player_state_from_raw() {
        assert_eq!(PlayerState::from_raw("PLAYING").unwrap(), PlayerState::Playing);
        assert_eq!(PlayerState::from_raw("PAUSED").unwrap(), PlayerState::Paused);
        assert_eq!(PlayerState::from_raw("STOPPED").unwrap(), PlayerState::Stopped);

        let err = PlayerState::from_raw("playing").unwrap_err();
        assert!(matches!(err, Error::IllegalPlayerState(ref raw) if raw == "playing"));
    }

    #[test]
    fn test_search_batch_defaults() {
        let json = r#"{"search_string": "abc", "batch_index": 2}"#;
        let batch: SearchResultBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.batch_index, 2);
        assert!(!batch.search_completed);
        assert!(!batch.batch_completed);
        assert!(!batch.has_error);
        assert!(batch.results.is_empty());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(65_000), "01:05");
        assert_eq!(format_duration(599_999), "09:59");
        assert_eq!(format_duration(3_661_000), "1:01:01");
        assert_eq!(format_duration(36_000_000), "10:00:00");
    }
}
