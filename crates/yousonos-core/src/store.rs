//! Two-phase mirror of a server-owned ordered collection.
//!
//! The store keeps the last authoritative snapshot pushed by the server and,
//! on top of it, an optional local-intent overlay holding optimistic edits.
//! Readers always see the overlay when one exists. Every push collapses the
//! store back to the pushed snapshot: the server always wins, including over
//! a newer local edit it has not acknowledged yet.

use tracing::debug;

use crate::model::{Device, PlaylistEntry};

/// An item with a stable identity inside its collection.
pub trait Keyed {
    /// Identity of the item.
    fn key(&self) -> &str;
}

impl Keyed for PlaylistEntry {
    fn key(&self) -> &str {
        &self.playlist_entry_id
    }
}

impl Keyed for Device {
    fn key(&self) -> &str {
        &self.device_name
    }
}

/// Ordered, keyed collection with an optimistic overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticStore<T> {
    authoritative: Vec<T>,
    local: Option<Vec<T>>,
}

impl<T> Default for OptimisticStore<T> {
    fn default() -> Self {
        Self {
            authoritative: Vec::new(),
            local: None,
        }
    }
}

impl<T: Keyed + Clone + PartialEq> OptimisticStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence readers should see.
    #[must_use]
    pub fn items(&self) -> &[T] {
        self.local.as_deref().unwrap_or(&self.authoritative)
    }

    /// The last snapshot pushed by the server.
    #[must_use]
    pub fn authoritative(&self) -> &[T] {
        &self.authoritative
    }

    /// Whether unconfirmed local edits are being shown.
    #[must_use]
    pub const fn has_local_intent(&self) -> bool {
        self.local.is_some()
    }

    /// Number of visible items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Whether no item is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Visible position of the item with `key`.
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.items().iter().position(|item| item.key() == key)
    }

    /// Visible item with `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.items().iter().find(|item| item.key() == key)
    }

    fn overlay_mut(&mut self) -> &mut Vec<T> {
        self.local.get_or_insert_with(|| self.authoritative.clone())
    }

    /// Move the item with `key` so that it ends up at `target`.
    ///
    /// Targets past the end are clamped to the last position. Returns the
    /// final position, or `None` when no item has `key`.
    pub fn move_item(&mut self, key: &str, target: usize) -> Option<usize> {
        let from = self.position(key)?;
        let overlay = self.overlay_mut();
        let target = target.min(overlay.len() - 1);
        let item = overlay.remove(from);
        overlay.insert(target, item);
        Some(target)
    }

    /// Remove the item with `key`. Absent keys leave the store untouched.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let index = self.position(key)?;
        Some(self.overlay_mut().remove(index))
    }

    /// Edit the item with `key` in place. Returns whether an item was edited.
    pub fn update(&mut self, key: &str, edit: impl FnOnce(&mut T)) -> bool {
        let Some(index) = self.position(key) else {
            return false;
        };
        edit(&mut self.overlay_mut()[index]);
        true
    }

    /// Replace the store with a server snapshot, dropping every local edit.
    ///
    /// Returns whether the visible sequence changed.
    pub fn reconcile(&mut self, snapshot: Vec<T>) -> bool {
        let changed = self.items() != snapshot.as_slice();
        if self.local.take().is_some() {
            debug!("Local intent overlay replaced by server snapshot");
        }
        self.authoritative = snapshot;
        changed
    }
}
