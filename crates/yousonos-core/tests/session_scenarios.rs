//! End-to-end scenarios of a remote session.
//!
//! Pushes and intents are fed through the public API and the commands the
//! session emits are read back from a channel sink.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{Instant, advance, timeout};
use yousonos_core::{
    ChannelSink, ClientConfig, DebounceKey, Device, Expired, InboundEvent, OutboundCommand,
    PlayPauseControl, PlaylistEntry, RawPush, RemoteSession, SearchResultBatch, SearchResultTrack,
    Track, TransportButtons, UserIntent,
};

type Session = RemoteSession<ChannelSink>;

struct Harness {
    session: Session,
    expired_rx: mpsc::UnboundedReceiver<Expired<DebounceKey>>,
    commands: mpsc::UnboundedReceiver<OutboundCommand>,
}

impl Harness {
    fn new() -> Self {
        let (sink, commands) = ChannelSink::new();
        let (session, expired_rx) = RemoteSession::new(sink, ClientConfig::default());
        Self {
            session,
            expired_rx,
            commands,
        }
    }

    fn intent(&mut self, intent: UserIntent) {
        self.session.handle_intent(intent).unwrap();
    }

    fn push(&mut self, topic: &str, payload: serde_json::Value) {
        self.session.handle_push(RawPush::new(topic, payload)).unwrap();
    }

    /// Handle expiries until one of them emits a command.
    async fn next_debounced(&mut self) -> OutboundCommand {
        loop {
            let expired = self.expired_rx.recv().await.unwrap();
            self.session.handle_expired(expired).unwrap();
            if let Ok(command) = self.commands.try_recv() {
                return command;
            }
        }
    }

    fn drain(&mut self) -> Vec<OutboundCommand> {
        std::iter::from_fn(|| self.commands.try_recv().ok()).collect()
    }
}

fn batch(
    query: &str,
    batch_index: u32,
    indices: std::ops::Range<u32>,
    search_completed: bool,
) -> serde_json::Value {
    serde_json::to_value(SearchResultBatch {
        search_string: query.to_string(),
        search_completed,
        has_error: false,
        batch_index,
        batch_completed: true,
        results: indices
            .map(|i| {
                let track = Track::new(format!("https://youtu.be/{i}"), format!("#{i}"));
                SearchResultTrack::new(i, track)
            })
            .collect(),
    })
    .unwrap()
}

fn playlist_payload(ids: &[&str]) -> serde_json::Value {
    let entries: Vec<PlaylistEntry> = ids
        .iter()
        .map(|id| PlaylistEntry::new(*id, Track::new(format!("u-{id}"), *id)))
        .collect();
    serde_json::to_value(entries).unwrap()
}

fn entry_ids(session: &Session) -> Vec<String> {
    session
        .playlist()
        .entries()
        .iter()
        .map(|e| e.playlist_entry_id.clone())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_paginated_search_completes_with_sorted_results() {
    let mut h = Harness::new();
    h.intent(UserIntent::SearchInput {
        query: "abc".to_string(),
    });
    let first = h.next_debounced().await;
    assert_eq!(
        first,
        OutboundCommand::SearchTracks {
            url: "abc".to_string(),
            batch_index: 0,
            requested_indices: (0..10).collect(),
        }
    );

    h.push("search_results", batch("abc", 0, 0..10, false));
    h.intent(UserIntent::LoadMore);
    assert_eq!(
        h.drain(),
        [OutboundCommand::SearchTracks {
            url: "abc".to_string(),
            batch_index: 1,
            requested_indices: (10..20).collect(),
        }]
    );

    h.push("search_results", batch("abc", 1, 10..20, true));
    let state = h.session.search().current_state().unwrap();
    assert!(state.is_completed());
    assert!(!state.has_error());

    let view = h.session.view();
    assert_eq!(view.search_rows.len(), 20);
    assert!(view.search_rows.windows(2).all(|w| w[0].index < w[1].index));
    assert!(!view.search.running);
    assert!(!view.search.has_more);

    h.intent(UserIntent::LoadMore);
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_playlist_move_is_optimistic_and_confirmed() {
    let mut h = Harness::new();
    h.push("playlist_changed", playlist_payload(&["e1", "e2", "e3", "e7", "e9"]));

    h.intent(UserIntent::MovePlaylistEntry {
        playlist_entry_id: "e7".to_string(),
        from_index: 3,
        to_index: 0,
    });
    assert_eq!(entry_ids(&h.session), ["e7", "e1", "e2", "e3", "e9"]);
    assert_eq!(
        h.drain(),
        [OutboundCommand::ChangePlaylistTrackPosition {
            playlist_entry_id: "e7".to_string(),
            playlist_target_position: 0,
        }]
    );

    let before = h.session.view();
    h.push("playlist_changed", playlist_payload(&["e7", "e1", "e2", "e3", "e9"]));
    assert_eq!(h.session.view(), before);
    assert!(!h.session.playlist().has_local_intent());
}

#[tokio::test(start_paused = true)]
async fn test_volume_slider_burst_sends_one_command() {
    let mut h = Harness::new();
    h.push(
        "sonos_setup",
        serde_json::to_value(vec![Device::new("Kitchen", 20, 100)]).unwrap(),
    );

    let mut last_change = Instant::now();
    for (i, volume) in [25, 30, 35].into_iter().enumerate() {
        if i > 0 {
            advance(Duration::from_millis(125)).await;
        }
        h.intent(UserIntent::SetVolume {
            device_name: "Kitchen".to_string(),
            volume,
        });
        last_change = Instant::now();
    }

    let command = h.next_debounced().await;
    assert_eq!(
        command,
        OutboundCommand::SetVolume {
            device_name: "Kitchen".to_string(),
            volume: 35,
        }
    );
    let waited = last_change.elapsed();
    assert!(waited >= Duration::from_millis(300));
    assert!(waited < Duration::from_millis(400));

    assert!(timeout(Duration::from_secs(5), h.expired_rx.recv()).await.is_err());
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clearing_search_while_batch_runs() {
    let mut h = Harness::new();
    h.intent(UserIntent::SearchInput {
        query: "abc".to_string(),
    });
    h.next_debounced().await;
    let mut partial = batch("abc", 0, 0..4, false);
    partial["batch_completed"] = json!(false);
    h.push("search_results", partial);
    assert!(h.session.view().search.running);

    // Typing resumes and is cleared before the debounce fires.
    h.intent(UserIntent::SearchInput {
        query: "abcd".to_string(),
    });
    h.intent(UserIntent::SearchInput {
        query: String::new(),
    });

    assert_eq!(h.drain(), [OutboundCommand::CancelSearch]);
    assert!(!h.session.is_debouncing(&DebounceKey::Search));
    assert!(h.session.view().search_rows.is_empty());
    assert_eq!(
        h.session.search().state("abc").unwrap().result_count(),
        4
    );
    assert!(timeout(Duration::from_secs(5), h.expired_rx.recv()).await.is_err());
}

#[tokio::test]
async fn test_null_track_resets_transport_controls() {
    let mut h = Harness::new();
    h.push(
        "playlist_changed",
        json!([
            {"playlist_entry_id": "e1", "status": "COMPLETED", "track": {"url": "u1", "title": "one"}},
            {"playlist_entry_id": "e2", "status": "CURRENT", "track": {"url": "u2", "title": "two"}},
            {"playlist_entry_id": "e3", "status": "WAITING", "track": {"url": "u3", "title": "three"}}
        ]),
    );
    h.push("player_state", json!({"player_state": "PLAYING"}));
    h.push(
        "current_track",
        json!({"url": "u2", "title": "two", "track_type": "youtube", "duration": 61000}),
    );

    let view = h.session.view();
    assert!(view.transport.previous_enabled);
    assert!(view.transport.next_enabled);
    assert!(view.play_pause.enabled);
    assert_eq!(view.progress.duration_label, "01:01");

    h.session.handle_event(InboundEvent::CurrentTrack(Track::null()));
    let view = h.session.view();
    assert_eq!(view.transport, TransportButtons::default());
    assert_eq!(view.play_pause, PlayPauseControl::INITIAL);
    assert!(!view.progress.enabled);
    assert_eq!(view.playlist_badge, 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_over_channels() {
    let (sink, mut commands) = ChannelSink::new();
    let (session, expired_rx) = RemoteSession::new(sink, ClientConfig::default());
    let (push_tx, push_rx) = mpsc::channel(16);
    let (intent_tx, intent_rx) = mpsc::channel(16);
    let handle = tokio::spawn(session.run(expired_rx, push_rx, intent_rx));

    push_tx
        .send(RawPush::new(
            "sonos_setup",
            json!([{"device_name": "Kitchen", "current_volume": 20, "max_volume": 100}]),
        ))
        .await
        .unwrap();
    push_tx.send(RawPush::new("unknown_topic", json!({}))).await.unwrap();
    // Let the session drain its pushes before intents arrive on the other channel.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    intent_tx
        .send(UserIntent::SetVolume {
            device_name: "Kitchen".to_string(),
            volume: 150,
        })
        .await
        .unwrap();
    intent_tx.send(UserIntent::TogglePlayPause).await.unwrap();

    assert_eq!(commands.recv().await.unwrap(), OutboundCommand::TogglePlayPause);
    assert_eq!(
        commands.recv().await.unwrap(),
        OutboundCommand::SetVolume {
            device_name: "Kitchen".to_string(),
            volume: 100,
        }
    );

    drop(push_tx);
    drop(intent_tx);
    assert!(handle.await.unwrap().is_ok());
}
