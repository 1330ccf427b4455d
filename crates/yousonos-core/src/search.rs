//! Aggregation of paginated search results.
//!
//! Each query string owns a [`SearchState`]: the merged `index -> track` map,
//! the set of batches still running and the monotonic completed/error flags.
//! Pages may arrive in any order; merging is keyed by result index, so the
//! sorted output does not depend on delivery order.
//!
//! States are kept for every query seen during the session. Typing a query
//! again shows its cached results without fetching them again.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::model::{SearchResultBatch, SearchResultTrack, Track};
use crate::protocol::OutboundCommand;

/// Default number of new result indices requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Aggregated state of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    results: BTreeMap<u32, Track>,
    running_batches: BTreeSet<u32>,
    max_batch_index: u32,
    completed: bool,
    has_error: bool,
}

impl SearchState {
    /// Whether at least one batch is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.running_batches.is_empty()
    }

    /// Whether the server reported the search as exhausted. Never reverts.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Whether any batch reported an error. Never reverts.
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.has_error
    }

    /// Whether another page may still be requested.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        !self.completed
    }

    /// Index the next requested batch will carry.
    #[must_use]
    pub const fn max_batch_index(&self) -> u32 {
        self.max_batch_index
    }

    /// Batches requested but not completed yet.
    pub fn running_batches(&self) -> impl Iterator<Item = u32> + '_ {
        self.running_batches.iter().copied()
    }

    /// Number of merged results.
    #[must_use]
    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Merged results sorted by index.
    #[must_use]
    pub fn results(&self) -> Vec<SearchResultTrack> {
        self.results
            .iter()
            .map(|(index, track)| SearchResultTrack::new(*index, track.clone()))
            .collect()
    }

    /// Indices to fetch next: the lowest `page_size` gaps below the highest
    /// known index, followed by up to `page_size` indices after it.
    ///
    /// Walking the gaps stops after `page_size` hits, so the work is bounded
    /// by the number of merged results rather than by the highest index.
    #[must_use]
    pub fn next_requested_indices(&self, page_size: u32) -> Vec<u32> {
        let Some(&max_index) = self.results.keys().next_back() else {
            return (0..page_size).collect();
        };
        let gaps = (0..max_index)
            .filter(|index| !self.results.contains_key(index))
            .take(page_size as usize);
        let tail = max_index
            .checked_add(1)
            .map(|first| first..=max_index.saturating_add(page_size))
            .into_iter()
            .flatten();
        gaps.chain(tail).collect()
    }

    fn start_batch(&mut self) -> u32 {
        let batch_index = self.max_batch_index;
        self.running_batches.insert(batch_index);
        self.max_batch_index += 1;
        batch_index
    }

    fn merge(&mut self, batch: SearchResultBatch) {
        for result in batch.results {
            self.results.insert(result.index, result.track);
        }
        if batch.batch_completed {
            self.running_batches.remove(&batch.batch_index);
        }
        self.has_error |= batch.has_error;
        self.completed |= batch.search_completed;
    }
}

/// Search results of every query seen during the session.
#[derive(Debug, Clone)]
pub struct SearchAggregator {
    page_size: u32,
    queries: HashMap<String, SearchState>,
    current: String,
}

impl Default for SearchAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl SearchAggregator {
    /// Create an aggregator requesting `page_size` new indices per page.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            queries: HashMap::new(),
            current: String::new(),
        }
    }

    /// Query whose results are displayed. Empty means no active query.
    #[must_use]
    pub fn current_query(&self) -> &str {
        &self.current
    }

    /// Make `query` the displayed query and start fetching it.
    ///
    /// Nothing is fetched when the query is already running or completed, so
    /// a cached query resurfaces as is. An empty query behaves like [`clear`](Self::clear).
    pub fn search(&mut self, query: &str) -> Option<OutboundCommand> {
        if query.is_empty() {
            return Some(self.clear());
        }
        self.current = query.to_string();

        let state = self.queries.entry(query.to_string()).or_default();
        if state.is_running() || state.is_completed() {
            debug!(
                "Search for '{}' already {}, showing cached results",
                query,
                if state.is_completed() { "completed" } else { "running" }
            );
            return None;
        }
        self.request_page(query)
    }

    /// Request the next page of `query`. `None` once the query is completed.
    pub fn request_page(&mut self, query: &str) -> Option<OutboundCommand> {
        if query.is_empty() {
            return None;
        }
        let page_size = self.page_size;
        let state = self.queries.entry(query.to_string()).or_default();
        if state.is_completed() {
            debug!("Search for '{}' is completed, no page requested", query);
            return None;
        }

        let requested_indices = state.next_requested_indices(page_size);
        let batch_index = state.start_batch();
        info!(
            "Requesting batch {} of '{}' ({} indices)",
            batch_index,
            query,
            requested_indices.len()
        );
        Some(OutboundCommand::SearchTracks {
            url: query.to_string(),
            batch_index,
            requested_indices,
        })
    }

    /// Request the next page of the displayed query, if it is idle and not exhausted.
    pub fn load_more(&mut self) -> Option<OutboundCommand> {
        let state = self.current_state()?;
        if state.is_running() || !state.has_more() {
            return None;
        }
        let query = self.current.clone();
        self.request_page(&query)
    }

    /// Stop displaying results. Cached results stay available.
    pub fn clear(&mut self) -> OutboundCommand {
        if !self.current.is_empty() {
            info!("Search for '{}' cleared", self.current);
        }
        self.current.clear();
        OutboundCommand::CancelSearch
    }

    /// Merge a pushed page. Returns whether it belongs to the displayed query.
    pub fn apply_batch(&mut self, batch: SearchResultBatch) -> bool {
        let query = batch.search_string.clone();
        let state = self.queries.entry(query.clone()).or_default();
        if batch.has_error && !state.has_error() {
            warn!("Search for '{}' reported an error", query);
        }
        debug!(
            "Merging batch {} of '{}' ({} results, batch completed: {}, search completed: {})",
            batch.batch_index,
            query,
            batch.results.len(),
            batch.batch_completed,
            batch.search_completed
        );
        state.merge(batch);
        query == self.current
    }

    /// State of `query`, if it was ever searched or answered.
    #[must_use]
    pub fn state(&self, query: &str) -> Option<&SearchState> {
        self.queries.get(query)
    }

    /// State of the displayed query.
    #[must_use]
    pub fn current_state(&self) -> Option<&SearchState> {
        if self.current.is_empty() {
            return None;
        }
        self.state(&self.current)
    }

    /// Sorted results of the displayed query; empty without an active query.
    #[must_use]
    pub fn current_results(&self) -> Vec<SearchResultTrack> {
        self.current_state()
            .map(SearchState::results)
            .unwrap_or_default()
    }

    /// Number of queries with cached state.
    #[must_use]
    pub fn cached_query_count(&self) -> usize {
        self.queries.len()
    }
}
