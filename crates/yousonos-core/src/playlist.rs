//! Local mirror of the server playlist with optimistic reorder and delete.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::model::PlaylistEntry;
use crate::protocol::OutboundCommand;
use crate::store::OptimisticStore;

/// Playlist mirror. Edits show immediately and produce the command that makes them durable.
#[derive(Debug, Clone, Default)]
pub struct PlaylistStore {
    entries: OptimisticStore<PlaylistEntry>,
}

impl PlaylistStore {
    /// Create an empty playlist mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible entries, in order.
    #[must_use]
    pub fn entries(&self) -> &[PlaylistEntry] {
        self.entries.items()
    }

    /// Number of visible entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the playlist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether unconfirmed edits are shown.
    #[must_use]
    pub const fn has_local_intent(&self) -> bool {
        self.entries.has_local_intent()
    }

    /// Move an entry, showing the result immediately.
    ///
    /// The entry is found by id; `from_index` is the position the caller saw
    /// and is only used for logging. Returns the reposition command, or
    /// `None` when the entry does not exist.
    pub fn apply_local_move(
        &mut self,
        entry_id: &str,
        from_index: usize,
        to_index: usize,
    ) -> Option<OutboundCommand> {
        let Some(target) = self.entries.move_item(entry_id, to_index) else {
            debug!("Ignoring move of unknown playlist entry {}", entry_id);
            return None;
        };
        info!(
            "Moved playlist entry {} from {} to {}",
            entry_id, from_index, target
        );
        Some(OutboundCommand::ChangePlaylistTrackPosition {
            playlist_entry_id: entry_id.to_string(),
            playlist_target_position: target,
        })
    }

    /// Delete an entry, showing the result immediately.
    ///
    /// Deleting an absent id changes nothing locally; the delete command is
    /// still returned.
    pub fn apply_local_delete(&mut self, entry_id: &str) -> OutboundCommand {
        if self.entries.remove(entry_id).is_some() {
            info!("Deleted playlist entry {}", entry_id);
        } else {
            debug!("Delete of absent playlist entry {} is a no-op", entry_id);
        }
        OutboundCommand::DeleteTrackFromPlaylist {
            playlist_entry_id: entry_id.to_string(),
        }
    }

    /// Replace the mirror with a pushed playlist. Returns whether the view changed.
    pub fn reconcile(&mut self, snapshot: Vec<PlaylistEntry>) -> bool {
        let changed = self.entries.reconcile(snapshot);
        debug!(
            "Playlist reconciled ({} entries, changed: {})",
            self.len(),
            changed
        );
        changed
    }

    /// Urls of every visible entry.
    #[must_use]
    pub fn track_urls(&self) -> HashSet<&str> {
        self.entries()
            .iter()
            .map(|entry| entry.track.url.as_str())
            .collect()
    }

    /// Index of the entry being played.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.entries().iter().position(PlaylistEntry::is_current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{PlaylistEntryStatus, Track};

    fn entry(id: &str) -> PlaylistEntry {
        PlaylistEntry::new(id, Track::new(format!("https://youtu.be/{id}"), id))
    }

    fn playlist(ids: &[&str]) -> Vec<PlaylistEntry> {
        ids.iter().map(|id| entry(id)).collect()
    }

    fn ids(store: &PlaylistStore) -> Vec<String> {
        store
            .entries()
            .iter()
            .map(|e| e.playlist_entry_id.clone())
            .collect()
    }

    #[test]
    fn test_move_emits_reposition_command() {
        let mut store = PlaylistStore::new();
        store.reconcile(playlist(&["e1", "e2", "e3", "e7", "e9"]));

        let command = store.apply_local_move("e7", 3, 0);
        assert_eq!(
            command,
            Some(OutboundCommand::ChangePlaylistTrackPosition {
                playlist_entry_id: "e7".to_string(),
                playlist_target_position: 0,
            })
        );
        assert_eq!(ids(&store), ["e7", "e1", "e2", "e3", "e9"]);
    }

    #[test]
    fn test_move_then_matching_push_is_idempotent() {
        let mut store = PlaylistStore::new();
        store.reconcile(playlist(&["e1", "e2", "e3", "e7"]));
        store.apply_local_move("e7", 3, 0);
        let after_move = ids(&store);

        assert!(!store.reconcile(playlist(&["e7", "e1", "e2", "e3"])));
        assert_eq!(ids(&store), after_move);
        assert!(!store.has_local_intent());
    }

    #[test]
    fn test_move_of_unknown_entry_is_ignored() {
        let mut store = PlaylistStore::new();
        store.reconcile(playlist(&["e1", "e2"]));
        assert_eq!(store.apply_local_move("nope", 0, 1), None);
        assert_eq!(ids(&store), ["e1", "e2"]);
    }

    #[test]
    fn test_move_with_stale_from_index_uses_entry_id() {
        let mut store = PlaylistStore::new();
        store.reconcile(playlist(&["e1", "e2", "e3"]));
        store.apply_local_move("e3", 0, 1);
        assert_eq!(ids(&store), ["e1", "e3", "e2"]);
    }

    #[test]
    fn test_delete_removes_and_emits() {
        let mut store = PlaylistStore::new();
        store.reconcile(playlist(&["e1", "e2", "e3"]));

        let command = store.apply_local_delete("e2");
        assert_eq!(
            command,
            OutboundCommand::DeleteTrackFromPlaylist {
                playlist_entry_id: "e2".to_string()
            }
        );
        assert_eq!(ids(&store), ["e1", "e3"]);
        assert!(!store.track_urls().contains("https://youtu.be/e2"));
    }

    #[test]
    fn test_delete_absent_entry_leaves_sequence_unchanged() {
        let mut store = PlaylistStore::new();
        store.reconcile(playlist(&["e1", "e2"]));

        let command = store.apply_local_delete("e5");
        assert!(matches!(command, OutboundCommand::DeleteTrackFromPlaylist { .. }));
        assert_eq!(ids(&store), ["e1", "e2"]);
        assert!(!store.has_local_intent());
    }

    #[test]
    fn test_track_urls_follow_visible_sequence() {
        let mut store = PlaylistStore::new();
        store.reconcile(playlist(&["e1", "e2"]));
        assert!(store.track_urls().contains("https://youtu.be/e1"));

        store.apply_local_delete("e1");
        let urls = store.track_urls();
        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://youtu.be/e2"));
    }

    #[test]
    fn test_current_index_follows_visible_sequence() {
        let mut store = PlaylistStore::new();
        assert_eq!(store.current_index(), None);

        store.reconcile(vec![
            entry("e1").with_status(PlaylistEntryStatus::Completed),
            entry("e2").with_status(PlaylistEntryStatus::Current),
            entry("e3"),
        ]);
        assert_eq!(store.current_index(), Some(1));

        store.apply_local_move("e2", 1, 2);
        assert_eq!(store.current_index(), Some(2));
    }
}
