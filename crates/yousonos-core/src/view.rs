//! Pure projections from mirrored state to display facts.
//!
//! Nothing here holds state. Every function reads a [`PlayerSnapshot`] (or a
//! part of it) and returns plain descriptors a renderer can paint.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::Result;
use crate::model::{
    Device, PlayerState, PlaylistEntry, SearchResultTrack, Track, TrackStatus, format_duration,
};

/// Borrowed view of everything the projector reads.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSnapshot<'a> {
    /// Loaded track, or the null sentinel.
    pub current_track: &'a Track,
    /// Last pushed player status.
    pub player_state: PlayerState,
    /// Visible playlist.
    pub playlist: &'a [PlaylistEntry],
    /// Urls of the visible playlist entries.
    pub playlist_urls: &'a HashSet<&'a str>,
    /// Position of the CURRENT entry in the visible playlist.
    pub current_index: Option<usize>,
    /// Visible device volumes.
    pub devices: &'a [Device],
    /// Displayed playback position.
    pub elapsed_ms: u64,
    /// Displayed query, empty when none.
    pub search_query: &'a str,
    /// Sorted results of the displayed query.
    pub search_results: &'a [SearchResultTrack],
    /// A batch of the displayed query is running.
    pub search_running: bool,
    /// The displayed query reported an error.
    pub search_error: bool,
    /// More pages of the displayed query can be requested.
    pub search_has_more: bool,
}

/// Enablement of the previous/next buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransportButtons {
    /// "Previous" can be pressed.
    pub previous_enabled: bool,
    /// "Next" can be pressed.
    pub next_enabled: bool,
}

/// Icon shown on the play/pause button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayPauseIcon {
    /// Triangle: pressing starts playback.
    Play,
    /// Bars: pressing pauses playback.
    Pause,
}

/// State of the play/pause button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayPauseControl {
    /// Icon to paint.
    pub icon: PlayPauseIcon,
    /// Whether the button can be pressed.
    pub enabled: bool,
}

impl PlayPauseControl {
    /// Button state before anything is loaded.
    pub const INITIAL: Self = Self {
        icon: PlayPauseIcon::Play,
        enabled: false,
    };
}

/// State of the seek slider and its labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressControl {
    /// Slider and skip buttons can be used.
    pub enabled: bool,
    /// Slider position in milliseconds.
    pub position_ms: u64,
    /// Slider maximum in milliseconds.
    pub duration_ms: u64,
    /// Elapsed time label.
    pub elapsed_label: String,
    /// Total time label.
    pub duration_label: String,
}

/// Decoration of one track row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TrackRowDecoration {
    /// The row is the loaded track.
    pub current: bool,
    /// The row is the loaded track and it is playing.
    pub playing: bool,
    /// The row's track is in the playlist.
    pub in_playlist: bool,
}

/// One row of the search result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRow {
    /// Result index.
    pub index: u32,
    /// Track url.
    pub url: String,
    /// Track title.
    pub title: String,
    /// Row decoration.
    pub decoration: TrackRowDecoration,
}

/// One row of the playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistRow {
    /// Entry id, the handle for move, delete and play.
    pub playlist_entry_id: String,
    /// Track url.
    pub url: String,
    /// Track title.
    pub title: String,
    /// Row decoration.
    pub decoration: TrackRowDecoration,
}

/// Search field indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SearchIndicator {
    /// Show the spinner.
    pub running: bool,
    /// Mark the field as invalid.
    pub error: bool,
    /// Infinite scroll may ask for more.
    pub has_more: bool,
}

/// Everything a renderer needs, derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    /// Play/pause button.
    pub play_pause: PlayPauseControl,
    /// Previous/next buttons.
    pub transport: TransportButtons,
    /// Seek slider.
    pub progress: ProgressControl,
    /// Number shown on the playlist tab badge.
    pub playlist_badge: usize,
    /// Rows of the playlist, in visible order.
    pub playlist_rows: Vec<PlaylistRow>,
    /// Search field indicators.
    pub search: SearchIndicator,
    /// Rows of the search result list.
    pub search_rows: Vec<SearchRow>,
    /// Device volume sliders.
    pub devices: Vec<Device>,
}

/// Previous is enabled when the current entry is not first; next when it is not last.
#[must_use]
pub const fn transport_buttons(current_index: Option<usize>, len: usize) -> TransportButtons {
    let Some(current) = current_index else {
        return TransportButtons {
            previous_enabled: false,
            next_enabled: false,
        };
    };
    TransportButtons {
        previous_enabled: current > 0,
        next_enabled: current + 1 < len,
    }
}

/// Total mapping from player status to the play/pause button.
#[must_use]
pub const fn play_pause_control(state: PlayerState) -> PlayPauseControl {
    match state {
        PlayerState::Playing => PlayPauseControl {
            icon: PlayPauseIcon::Pause,
            enabled: true,
        },
        PlayerState::Paused => PlayPauseControl {
            icon: PlayPauseIcon::Play,
            enabled: true,
        },
        PlayerState::Stopped => PlayPauseControl::INITIAL,
    }
}

/// Map a raw `player_state` value. Unknown values are contract violations.
pub fn play_pause_control_from_raw(raw: &str) -> Result<PlayPauseControl> {
    PlayerState::from_raw(raw).map(play_pause_control)
}

/// Seek slider for `track` at `elapsed_ms`. Disabled for the null track.
#[must_use]
pub fn progress_control(track: &Track, elapsed_ms: u64) -> ProgressControl {
    ProgressControl {
        enabled: !track.is_null(),
        position_ms: elapsed_ms,
        duration_ms: track.duration,
        elapsed_label: format_duration(elapsed_ms),
        duration_label: format_duration(track.duration),
    }
}

/// Decorate a search result row.
#[must_use]
pub fn search_row_decoration(
    track: &Track,
    current_track: &Track,
    playlist_urls: &HashSet<&str>,
) -> TrackRowDecoration {
    let current = !current_track.is_null() && current_track.url == track.url;
    TrackRowDecoration {
        current,
        playing: current && current_track.track_status == TrackStatus::Playing,
        in_playlist: playlist_urls.contains(track.url.as_str()),
    }
}

/// Decorate a playlist row.
#[must_use]
pub fn playlist_row_decoration(entry: &PlaylistEntry) -> TrackRowDecoration {
    let current = entry.is_current();
    TrackRowDecoration {
        current,
        playing: current && entry.track.track_status == TrackStatus::Playing,
        in_playlist: true,
    }
}

/// Derive the whole view from a snapshot.
///
/// With the null track loaded every transport control is in its initial,
/// disabled state, whatever the last player status and playlist say.
#[must_use]
pub fn project(snapshot: &PlayerSnapshot<'_>) -> ViewModel {
    let nothing_loaded = snapshot.current_track.is_null();
    let (play_pause, transport) = if nothing_loaded {
        (PlayPauseControl::INITIAL, TransportButtons::default())
    } else {
        (
            play_pause_control(snapshot.player_state),
            transport_buttons(snapshot.current_index, snapshot.playlist.len()),
        )
    };

    let playlist_rows = snapshot
        .playlist
        .iter()
        .map(|entry| PlaylistRow {
            playlist_entry_id: entry.playlist_entry_id.clone(),
            url: entry.track.url.clone(),
            title: entry.track.title.clone(),
            decoration: playlist_row_decoration(entry),
        })
        .collect();
    let search_rows = snapshot
        .search_results
        .iter()
        .map(|result| SearchRow {
            index: result.index,
            url: result.track.url.clone(),
            title: result.track.title.clone(),
            decoration: search_row_decoration(
                &result.track,
                snapshot.current_track,
                snapshot.playlist_urls,
            ),
        })
        .collect();

    ViewModel {
        play_pause,
        transport,
        progress: progress_control(snapshot.current_track, snapshot.elapsed_ms),
        playlist_badge: snapshot.playlist.len(),
        playlist_rows,
        search: SearchIndicator {
            running: snapshot.search_running,
            error: snapshot.search_error,
            has_more: !snapshot.search_query.is_empty() && snapshot.search_has_more,
        },
        search_rows,
        devices: snapshot.devices.to_vec(),
    }
}
