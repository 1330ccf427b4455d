//! The remote control session.
//!
//! A [`RemoteSession`] owns every store and is their only writer. Server
//! pushes, user intents and debounce expiries are applied one at a time,
//! synchronously, and outbound commands leave through the [`CommandSink`].
//! [`RemoteSession::run`] drives the session from three channels until its
//! inputs close or a contract violation stops it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::clock::PlaybackClock;
use crate::config::ClientConfig;
use crate::debounce::{Debouncer, Expired};
use crate::error::{ErrorKind, Result};
use crate::model::{PlayerState, Track};
use crate::playlist::PlaylistStore;
use crate::protocol::{CommandSink, InboundEvent, OutboundCommand, RawPush};
use crate::search::{SearchAggregator, SearchState};
use crate::view::{PlayerSnapshot, ViewModel, project};
use crate::volume::VolumeStore;

/// Timer slot of a debounced input. Every device volume has its own slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    /// Typed search query.
    Search,
    /// Seek slider and skip buttons.
    Seek,
    /// Volume slider of one device.
    Volume(String),
}

/// Latest value waiting on a debounce timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebouncedInput {
    /// Query to search.
    Search(String),
    /// Position to seek to, in milliseconds.
    Seek(u64),
    /// Clamped device volume.
    Volume(u32),
}

/// Something the user did on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UserIntent {
    /// The search field changed.
    SearchInput {
        /// Full content of the field.
        query: String,
    },
    /// The result list was scrolled to its end.
    LoadMore,
    /// A volume slider moved.
    SetVolume {
        /// Device of the slider.
        device_name: String,
        /// Requested volume, clamped before use.
        volume: i64,
    },
    /// The volume up button was pressed.
    VolumeUp {
        /// Device of the button.
        device_name: String,
    },
    /// The volume down button was pressed.
    VolumeDown {
        /// Device of the button.
        device_name: String,
    },
    /// A playlist row was dragged.
    MovePlaylistEntry {
        /// Dragged entry.
        playlist_entry_id: String,
        /// Row the drag started from.
        from_index: usize,
        /// Row the entry was dropped on.
        to_index: usize,
    },
    /// A playlist row was deleted.
    DeletePlaylistEntry {
        /// Deleted entry.
        playlist_entry_id: String,
    },
    /// A playlist row was selected for playback.
    PlayPlaylistEntry {
        /// Selected entry.
        playlist_entry_id: String,
    },
    /// The seek slider moved.
    Seek {
        /// Requested position in milliseconds.
        player_time: i64,
    },
    /// The skip forward button was pressed.
    SkipForward,
    /// The skip backward button was pressed.
    SkipBackward,
    /// The play/pause button was pressed.
    TogglePlayPause,
    /// The next button was pressed.
    NextTrack,
    /// The previous button was pressed.
    PreviousTrack,
    /// A search result was selected for playback.
    PlayTrack {
        /// Track url.
        url: String,
    },
    /// A search result was added to the playlist.
    AddTrackToPlaylist {
        /// Track url.
        url: String,
    },
}

/// State of one remote control connected to a server.
pub struct RemoteSession<S> {
    sink: S,
    config: ClientConfig,
    current_track: Track,
    player_state: PlayerState,
    playlist: PlaylistStore,
    volumes: VolumeStore,
    search: SearchAggregator,
    search_input: String,
    clock: PlaybackClock,
    debouncer: Debouncer<DebounceKey, DebouncedInput>,
}

impl<S: CommandSink> RemoteSession<S> {
    /// Create a session sending commands to `sink`.
    ///
    /// Returns the session and the receiver its debounce expiries arrive on.
    /// Hand both to [`run`](Self::run), or feed expiries back through
    /// [`handle_expired`](Self::handle_expired) when driving the session by hand.
    #[must_use]
    pub fn new(
        sink: S,
        config: ClientConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Expired<DebounceKey>>) {
        let config = config.validate();
        let (debouncer, expired_rx) = Debouncer::new(config.debounce.volume());
        let session = Self {
            sink,
            search: SearchAggregator::new(config.search_page_size),
            config,
            current_track: Track::null(),
            player_state: PlayerState::default(),
            playlist: PlaylistStore::new(),
            volumes: VolumeStore::new(),
            search_input: String::new(),
            clock: PlaybackClock::new(),
            debouncer,
        };
        (session, expired_rx)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Command sink of this session.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Loaded track, or the null sentinel.
    #[must_use]
    pub const fn current_track(&self) -> &Track {
        &self.current_track
    }

    /// Last pushed player status.
    #[must_use]
    pub const fn player_state(&self) -> PlayerState {
        self.player_state
    }

    /// Playlist mirror.
    #[must_use]
    pub const fn playlist(&self) -> &PlaylistStore {
        &self.playlist
    }

    /// Device volume mirror.
    #[must_use]
    pub const fn volumes(&self) -> &VolumeStore {
        &self.volumes
    }

    /// Search results of every query seen so far.
    #[must_use]
    pub const fn search(&self) -> &SearchAggregator {
        &self.search
    }

    /// Current content of the search field.
    #[must_use]
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// Playback position mirror.
    #[must_use]
    pub const fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Whether a value is waiting on the timer of `key`.
    #[must_use]
    pub fn is_debouncing(&self, key: &DebounceKey) -> bool {
        self.debouncer.is_pending(key)
    }

    /// Derive the display state.
    #[must_use]
    pub fn view(&self) -> ViewModel {
        let results = self.search.current_results();
        let state = self.search.current_state();
        let playlist_urls = self.playlist.track_urls();
        project(&PlayerSnapshot {
            current_track: &self.current_track,
            player_state: self.player_state,
            playlist: self.playlist.entries(),
            playlist_urls: &playlist_urls,
            current_index: self.playlist.current_index(),
            devices: self.volumes.devices(),
            elapsed_ms: self.clock.time_ms(),
            search_query: self.search.current_query(),
            search_results: &results,
            search_running: state.is_some_and(SearchState::is_running),
            search_error: state.is_some_and(SearchState::has_error),
            search_has_more: state.is_some_and(SearchState::has_more),
        })
    }

    /// Decode and apply a raw push.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for unknown topics and malformed payloads and
    /// a contract violation for an illegal player state. The session state is
    /// untouched in every error case.
    pub fn handle_push(&mut self, push: RawPush) -> Result<()> {
        let event = push.decode()?;
        self.handle_event(event);
        Ok(())
    }

    /// Apply a decoded push. The pushed snapshot always replaces local state.
    pub fn handle_event(&mut self, event: InboundEvent) {
        debug!("Handling {} push", event.topic());
        match event {
            InboundEvent::CurrentTrack(track) => {
                if track != self.current_track {
                    if track.is_null() {
                        info!("Nothing loaded");
                    } else {
                        info!("Current track: {}", track);
                    }
                }
                self.current_track = track;
            }
            InboundEvent::PlayerState(state) => {
                if state != self.player_state {
                    info!("Player state: {}", state);
                }
                self.player_state = state;
            }
            InboundEvent::PlaylistChanged(entries) => {
                self.playlist.reconcile(entries);
            }
            InboundEvent::VolumeChanged(devices) => {
                self.volumes.reconcile(devices);
            }
            InboundEvent::SearchResults(batch) => {
                self.search.apply_batch(batch);
            }
            InboundEvent::PlayerTime(time_ms) => {
                self.clock.on_player_time(time_ms);
            }
            InboundEvent::PlayerTimeUpdateActivation(time_ms) => {
                self.clock.on_activation(time_ms);
            }
            InboundEvent::SonosSetup(devices) => {
                self.volumes.setup(devices);
            }
        }
    }

    /// Apply a user intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink refuses a command.
    pub fn handle_intent(&mut self, intent: UserIntent) -> Result<()> {
        match intent {
            UserIntent::SearchInput { query } => self.on_search_input(query),
            UserIntent::LoadMore => match self.search.load_more() {
                Some(command) => self.send(command),
                None => Ok(()),
            },
            UserIntent::SetVolume {
                device_name,
                volume,
            } => {
                let volume = self.volumes.apply_local_volume(&device_name, volume);
                self.schedule_volume(device_name, volume);
                Ok(())
            }
            UserIntent::VolumeUp { device_name } => {
                let volume = self
                    .volumes
                    .step_volume(&device_name, i64::from(self.config.volume_step));
                self.schedule_volume(device_name, volume);
                Ok(())
            }
            UserIntent::VolumeDown { device_name } => {
                let volume = self
                    .volumes
                    .step_volume(&device_name, -i64::from(self.config.volume_step));
                self.schedule_volume(device_name, volume);
                Ok(())
            }
            UserIntent::MovePlaylistEntry {
                playlist_entry_id,
                from_index,
                to_index,
            } => match self
                .playlist
                .apply_local_move(&playlist_entry_id, from_index, to_index)
            {
                Some(command) => self.send(command),
                None => Ok(()),
            },
            UserIntent::DeletePlaylistEntry { playlist_entry_id } => {
                let command = self.playlist.apply_local_delete(&playlist_entry_id);
                self.send(command)
            }
            UserIntent::PlayPlaylistEntry { playlist_entry_id } => {
                self.send(OutboundCommand::PlayTrackOfPlaylist { playlist_entry_id })
            }
            UserIntent::Seek { player_time } => {
                self.on_seek(|clock| clock.seek(player_time));
                Ok(())
            }
            UserIntent::SkipForward => {
                let step = self.seek_step();
                self.on_seek(|clock| clock.skip(step));
                Ok(())
            }
            UserIntent::SkipBackward => {
                let step = self.seek_step();
                self.on_seek(|clock| clock.skip(-step));
                Ok(())
            }
            UserIntent::TogglePlayPause => self.send(OutboundCommand::TogglePlayPause),
            UserIntent::NextTrack => self.send(OutboundCommand::NextTrack),
            UserIntent::PreviousTrack => self.send(OutboundCommand::PreviousTrack),
            UserIntent::PlayTrack { url } => self.send(OutboundCommand::PlayTrack { url }),
            UserIntent::AddTrackToPlaylist { url } => {
                self.send(OutboundCommand::AddTrackToPlaylist { url })
            }
        }
    }

    /// Emit the value of an expired debounce timer.
    ///
    /// Notices from superseded or cancelled timers are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink refuses the command.
    pub fn handle_expired(&mut self, expired: Expired<DebounceKey>) -> Result<()> {
        let Some((key, value)) = self.debouncer.complete(expired) else {
            return Ok(());
        };
        let command = match (key, value) {
            (DebounceKey::Search, DebouncedInput::Search(query)) => {
                match self.search.search(&query) {
                    Some(command) => command,
                    None => return Ok(()),
                }
            }
            (DebounceKey::Seek, DebouncedInput::Seek(player_time)) => {
                OutboundCommand::SeekTo { player_time }
            }
            (DebounceKey::Volume(device_name), DebouncedInput::Volume(volume)) => {
                OutboundCommand::SetVolume {
                    device_name,
                    volume,
                }
            }
            (key, value) => {
                warn!("Debounced value {:?} does not match slot {:?}", value, key);
                return Ok(());
            }
        };
        self.send(command)
    }

    /// Drive the session until both inputs are closed and no debounced value is pending.
    ///
    /// Values still debouncing when the inputs close are emitted when their
    /// timers fire. Protocol errors are logged and skipped. A closed sink ends
    /// the session cleanly.
    ///
    /// # Errors
    ///
    /// Returns the contract violation that stopped the session.
    pub async fn run(
        mut self,
        mut expired_rx: mpsc::UnboundedReceiver<Expired<DebounceKey>>,
        mut pushes: mpsc::Receiver<RawPush>,
        mut intents: mpsc::Receiver<UserIntent>,
    ) -> Result<()> {
        info!("Remote session started");
        let mut pushes_open = true;
        let mut intents_open = true;

        while pushes_open || intents_open || self.debouncer.pending_count() > 0 {
            let outcome = tokio::select! {
                push = pushes.recv(), if pushes_open => match push {
                    Some(push) => self.handle_push(push),
                    None => {
                        debug!("Push channel closed");
                        pushes_open = false;
                        continue;
                    }
                },
                intent = intents.recv(), if intents_open => match intent {
                    Some(intent) => self.handle_intent(intent),
                    None => {
                        debug!("Intent channel closed");
                        intents_open = false;
                        continue;
                    }
                },
                Some(expired) = expired_rx.recv() => self.handle_expired(expired),
                else => break,
            };

            if let Err(e) = outcome {
                match e.kind() {
                    ErrorKind::ContractViolation => {
                        error!("Stopping session: {}", e);
                        return Err(e);
                    }
                    ErrorKind::Transport => {
                        info!("Command sink closed, ending session: {}", e);
                        self.debouncer.cancel_all();
                        return Ok(());
                    }
                    _ => warn!("Skipping input: {}", e),
                }
            }
            debug!("View: {:?}", self.view());
        }
        info!("Remote session ended");
        Ok(())
    }

    fn on_search_input(&mut self, query: String) -> Result<()> {
        self.search_input.clone_from(&query);
        if query.is_empty() {
            self.debouncer.cancel(&DebounceKey::Search);
            let command = self.search.clear();
            return self.send(command);
        }
        self.debouncer.schedule_after(
            DebounceKey::Search,
            DebouncedInput::Search(query),
            self.config.debounce.search(),
        );
        Ok(())
    }

    fn schedule_volume(&mut self, device_name: String, volume: Option<u32>) {
        if let Some(volume) = volume {
            self.debouncer.schedule_after(
                DebounceKey::Volume(device_name),
                DebouncedInput::Volume(volume),
                self.config.debounce.volume(),
            );
        }
    }

    fn seek_step(&self) -> i64 {
        i64::try_from(self.config.seek_step_ms).unwrap_or(i64::MAX)
    }

    fn on_seek(&mut self, seek: impl FnOnce(&mut PlaybackClock) -> u64) {
        if self.current_track.is_null() {
            debug!("Ignoring seek, nothing loaded");
            return;
        }
        let target = seek(&mut self.clock);
        self.debouncer.schedule_after(
            DebounceKey::Seek,
            DebouncedInput::Seek(target),
            self.config.debounce.seek(),
        );
    }

    fn send(&self, command: OutboundCommand) -> Result<()> {
        debug!("Sending {}", command);
        self.sink.send(command)
    }
}

impl<S> std::fmt::Debug for RemoteSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("current_track", &self.current_track.url)
            .field("player_state", &self.player_state)
            .field("playlist", &self.playlist.len())
            .field("search_query", &self.search.current_query())
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}
