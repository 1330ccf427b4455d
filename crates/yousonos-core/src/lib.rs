//! `youSonos` Core Library
//!
//! This crate provides the client-side state of the `youSonos` remote control:
//! - Decoding of server pushes and encoding of outbound commands
//! - Keyed trailing-edge debouncing of volume, search and seek input
//! - Aggregation of paginated, out-of-order search results
//! - Optimistic playlist and volume edits reconciled against server snapshots
//! - Pure projection of the mirrored state into display facts
//!
//! # Error Handling
//!
//! Every fallible operation returns [`Result`]. Errors are classified by
//! [`ErrorKind`]; only contract violations stop a running session.
//!
//! ```rust,ignore
//! use yousonos_core::{ChannelSink, ClientConfig, RemoteSession};
//!
//! let (sink, commands) = ChannelSink::new();
//! let (session, expired_rx) = RemoteSession::new(sink, ClientConfig::load()?);
//! session.run(expired_rx, pushes, intents).await?;
//! ```

pub mod clock;
pub mod config;
pub mod debounce;
pub mod error;
pub mod model;
pub mod playlist;
pub mod protocol;
pub mod search;
pub mod session;
pub mod store;
pub mod view;
pub mod volume;

pub use clock::PlaybackClock;
pub use config::{
    ClientConfig, DEFAULT_SEEK_STEP_MS, DebounceConfig, MAX_PAGE_SIZE, default_config_path,
};
pub use debounce::{Debouncer, Expired};
pub use error::{Error, ErrorKind, Result};
pub use model::{
    Device, PlayerState, PlaylistEntry, PlaylistEntryStatus, SearchResultBatch,
    SearchResultTrack, Track, TrackStatus, TrackType, format_duration,
};
pub use playlist::PlaylistStore;
pub use protocol::{ChannelSink, CommandSink, InboundEvent, OutboundCommand, RawPush, Topic};
pub use search::{DEFAULT_PAGE_SIZE, SearchAggregator, SearchState};
pub use session::{DebounceKey, DebouncedInput, RemoteSession, UserIntent};
pub use store::{Keyed, OptimisticStore};
pub use view::{
    PlayPauseControl, PlayPauseIcon, PlayerSnapshot, PlaylistRow, ProgressControl, SearchIndicator,
    SearchRow,
    TrackRowDecoration, TransportButtons, ViewModel, play_pause_control,
    play_pause_control_from_raw, playlist_row_decoration, progress_control, project,
    search_row_decoration, transport_buttons,
};
pub use volume::{DEFAULT_VOLUME_STEP, VolumeStore};
