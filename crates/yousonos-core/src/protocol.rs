//! Topics pushed by the server and commands sent back to it.
//!
//! The transport itself is not implemented here: inbound frames arrive as a
//! topic name plus a JSON payload, and outbound commands leave through a
//! [`CommandSink`] as a command name plus a JSON-serialized payload string.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::model::{Device, PlayerState, PlaylistEntry, SearchResultBatch, Track};

/// Name of a server push topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The loaded track changed.
    CurrentTrack,
    /// The player status changed.
    PlayerState,
    /// The playlist changed.
    PlaylistChanged,
    /// One or more device volumes changed.
    VolumeChanged,
    /// A page of search results.
    SearchResults,
    /// Elapsed playback time tick.
    PlayerTime,
    /// Elapsed time after a seek; resumes time tracking.
    PlayerTimeUpdateActivation,
    /// Initial device list.
    SonosSetup,
}

impl Topic {
    /// All topics, in protocol order.
    pub const ALL: [Self; 8] = [
        Self::CurrentTrack,
        Self::PlayerState,
        Self::PlaylistChanged,
        Self::VolumeChanged,
        Self::SearchResults,
        Self::PlayerTime,
        Self::PlayerTimeUpdateActivation,
        Self::SonosSetup,
    ];

    /// Wire name of the topic.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CurrentTrack => "current_track",
            Self::PlayerState => "player_state",
            Self::PlaylistChanged => "playlist_changed",
            Self::VolumeChanged => "volume_changed",
            Self::SearchResults => "search_results",
            Self::PlayerTime => "player_time",
            Self::PlayerTimeUpdateActivation => "player_time_update_activation",
            Self::SonosSetup => "sonos_setup",
        }
    }
}

impl FromStr for Topic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| Error::UnknownTopic(s.to_string()))
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct PlayerStatePayload {
    player_state: String,
}

/// A decoded server push.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `current_track`: the loaded track, or the null sentinel.
    CurrentTrack(Track),
    /// `player_state`: the player status.
    PlayerState(PlayerState),
    /// `playlist_changed`: the full, ordered playlist.
    PlaylistChanged(Vec<PlaylistEntry>),
    /// `volume_changed`: authoritative device volumes.
    VolumeChanged(Vec<Device>),
    /// `search_results`: one page of results.
    SearchResults(SearchResultBatch),
    /// `player_time`: elapsed milliseconds.
    PlayerTime(u64),
    /// `player_time_update_activation`: elapsed milliseconds after a seek.
    PlayerTimeUpdateActivation(u64),
    /// `sonos_setup`: the device list.
    SonosSetup(Vec<Device>),
}

impl InboundEvent {
    /// Decode a push from its topic name and JSON payload.
    ///
    /// Unknown topics and malformed payloads are protocol errors. A
    /// `player_state` outside the declared enum is a contract violation.
    pub fn decode(topic: &str, payload: Value) -> Result<Self> {
        let topic: Topic = topic.parse()?;
        let event = match topic {
            Topic::CurrentTrack => Self::CurrentTrack(parse_payload(topic, payload)?),
            Topic::PlayerState => {
                let raw: PlayerStatePayload = parse_payload(topic, payload)?;
                Self::PlayerState(PlayerState::from_raw(&raw.player_state)?)
            }
            Topic::PlaylistChanged => Self::PlaylistChanged(parse_payload(topic, payload)?),
            Topic::VolumeChanged => Self::VolumeChanged(parse_payload(topic, payload)?),
            Topic::SearchResults => Self::SearchResults(parse_payload(topic, payload)?),
            Topic::PlayerTime => Self::PlayerTime(parse_payload(topic, payload)?),
            Topic::PlayerTimeUpdateActivation => {
                Self::PlayerTimeUpdateActivation(parse_payload(topic, payload)?)
            }
            Topic::SonosSetup => Self::SonosSetup(parse_payload(topic, payload)?),
        };
        Ok(event)
    }

    /// Topic this event arrived on.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::CurrentTrack(_) => Topic::CurrentTrack,
            Self::PlayerState(_) => Topic::PlayerState,
            Self::PlaylistChanged(_) => Topic::PlaylistChanged,
            Self::VolumeChanged(_) => Topic::VolumeChanged,
            Self::SearchResults(_) => Topic::SearchResults,
            Self::PlayerTime(_) => Topic::PlayerTime,
            Self::PlayerTimeUpdateActivation(_) => Topic::PlayerTimeUpdateActivation,
            Self::SonosSetup(_) => Topic::SonosSetup,
        }
    }
}

fn parse_payload<T: DeserializeOwned>(topic: Topic, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|source| Error::MalformedPayload {
        topic: topic.as_str().to_string(),
        source,
    })
}

/// An undecoded server push as it comes off the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPush {
    /// Topic name.
    pub topic: String,
    /// JSON payload.
    #[serde(default)]
    pub payload: Value,
}

impl RawPush {
    /// Create a push from a topic name and payload.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Decode into a typed event.
    ///
    /// # Errors
    ///
    /// See [`InboundEvent::decode`].
    pub fn decode(self) -> Result<InboundEvent> {
        InboundEvent::decode(&self.topic, self.payload)
    }
}

/// A command sent to the server.
///
/// Fire-and-forget: the server's next push is the only acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Set the volume of one device.
    SetVolume {
        /// Target device.
        device_name: String,
        /// New volume, already clamped.
        volume: u32,
    },
    /// Toggle between playing and paused.
    TogglePlayPause,
    /// Skip to the next playlist entry.
    NextTrack,
    /// Go back to the previous playlist entry.
    PreviousTrack,
    /// Fetch a page of results for a query.
    SearchTracks {
        /// The query string (a url, an id or keywords).
        url: String,
        /// Batch tag echoed back in the results.
        batch_index: u32,
        /// Result indices to fetch.
        requested_indices: Vec<u32>,
    },
    /// Abort the running search.
    CancelSearch,
    /// Play a track right away.
    PlayTrack {
        /// Track url.
        url: String,
    },
    /// Append a track to the playlist.
    AddTrackToPlaylist {
        /// Track url.
        url: String,
    },
    /// Remove a playlist entry.
    DeleteTrackFromPlaylist {
        /// Entry to remove.
        playlist_entry_id: String,
    },
    /// Play a playlist entry.
    PlayTrackOfPlaylist {
        /// Entry to play.
        playlist_entry_id: String,
    },
    /// Move a playlist entry.
    ChangePlaylistTrackPosition {
        /// Entry to move.
        playlist_entry_id: String,
        /// Index the entry should end up at.
        playlist_target_position: usize,
    },
    /// Seek within the current track.
    SeekTo {
        /// Target position in milliseconds.
        player_time: u64,
    },
}

impl OutboundCommand {
    /// Wire name of the command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetVolume { .. } => "set_volume",
            Self::TogglePlayPause => "toggle_play_pause",
            Self::NextTrack => "next_track",
            Self::PreviousTrack => "previous_track",
            Self::SearchTracks { .. } => "search_tracks",
            Self::CancelSearch => "cancel_search",
            Self::PlayTrack { .. } => "play_track",
            Self::AddTrackToPlaylist { .. } => "add_track_to_playlist",
            Self::DeleteTrackFromPlaylist { .. } => "delete_track_from_playlist",
            Self::PlayTrackOfPlaylist { .. } => "play_track_of_playlist",
            Self::ChangePlaylistTrackPosition { .. } => "change_playlist_track_position",
            Self::SeekTo { .. } => "seek_to",
        }
    }

    /// Payload object of the command.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::SetVolume {
                device_name,
                volume,
            } => json!({ "device_name": device_name, "volume": volume }),
            Self::TogglePlayPause | Self::NextTrack | Self::PreviousTrack | Self::CancelSearch => {
                json!({})
            }
            Self::SearchTracks {
                url,
                batch_index,
                requested_indices,
            } => json!({
                "url": url,
                "batch_index": batch_index,
                "requested_indices": requested_indices,
            }),
            Self::PlayTrack { url } | Self::AddTrackToPlaylist { url } => json!({ "url": url }),
            Self::DeleteTrackFromPlaylist { playlist_entry_id }
            | Self::PlayTrackOfPlaylist { playlist_entry_id } => {
                json!({ "playlist_entry_id": playlist_entry_id })
            }
            Self::ChangePlaylistTrackPosition {
                playlist_entry_id,
                playlist_target_position,
            } => json!({
                "playlist_entry_id": playlist_entry_id,
                "playlist_target_position": playlist_target_position,
            }),
            Self::SeekTo { player_time } => json!({ "player_time": player_time }),
        }
    }

    /// Payload serialized as the JSON string the transport carries.
    pub fn payload_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.payload())?)
    }
}

impl std::fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name(), self.payload())
    }
}

/// Destination of outbound commands.
/// This trait allows for mocking in tests.
#[cfg_attr(test, mockall::automock)]
pub trait CommandSink: Send {
    /// Hand a command to the transport.
    fn send(&self, command: OutboundCommand) -> Result<()>;
}

/// Command sink backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutboundCommand>,
}

impl ChannelSink {
    /// Create a sink and the receiver the transport drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl CommandSink for ChannelSink {
    fn send(&self, command: OutboundCommand) -> Result<()> {
        let name = command.name();
        self.tx.send(command).map_err(|e| Error::SendFailed {
            command: name,
            reason: e.to_string(),
        })
    }
}
