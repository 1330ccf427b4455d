//! Trailing-edge debouncing of locally generated values.
//!
//! Every key owns at most one pending timer. Scheduling a key again replaces
//! its value and restarts its timer, so intermediate values are never emitted.
//! Expiries are delivered as [`Expired`] notices over a channel; the owner
//! turns a notice back into the value with [`Debouncer::complete`], which
//! rejects notices from timers that were superseded or cancelled after they
//! woke up.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// Notice that the timer of `key` ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expired<K> {
    /// Key whose timer expired.
    pub key: K,
    generation: u64,
}

/// A scheduled value waiting for its quiescence interval.
struct Pending<V> {
    value: V,
    generation: u64,
    /// Dropping this sender stops the timer task.
    _cancel: oneshot::Sender<()>,
}

/// Keyed trailing-edge debouncer. Last value wins.
pub struct Debouncer<K, V> {
    delay: Duration,
    pending: HashMap<K, Pending<V>>,
    next_generation: u64,
    expired_tx: mpsc::UnboundedSender<Expired<K>>,
}

impl<K, V> Debouncer<K, V>
where
    K: Clone + Eq + Hash + Send + std::fmt::Debug + 'static,
{
    /// Create a debouncer with a default interval.
    ///
    /// Returns the debouncer and the receiver on which expiries arrive.
    #[must_use]
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<Expired<K>>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                pending: HashMap::new(),
                next_generation: 0,
                expired_tx,
            },
            expired_rx,
        )
    }

    /// Default interval of this debouncer.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Record `value` for `key` and restart its timer with the default interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, key: K, value: V) {
        self.schedule_after(key, value, self.delay);
    }

    /// Record `value` for `key` and restart its timer with `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_after(&mut self, key: K, value: V, delay: Duration) {
        let generation = self.next_generation;
        self.next_generation += 1;

        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let expired_tx = self.expired_tx.clone();
        let task_key = key.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    let _ = expired_tx.send(Expired { key: task_key, generation });
                }
                _ = &mut cancel_rx => {}
            }
        });

        let replaced = self.pending.insert(
            key,
            Pending {
                value,
                generation,
                _cancel: cancel_tx,
            },
        );
        if let Some(previous) = replaced {
            trace!("Superseded debounce generation {}", previous.generation);
        }
    }

    /// Abort the pending timer of `key` without emission.
    ///
    /// Returns the value that will now never be emitted.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|pending| {
            trace!("Cancelled debounce for {:?}", key);
            pending.value
        })
    }

    /// Abort every pending timer.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Resolve an expiry notice into the value to emit.
    ///
    /// Returns `None` when the notice belongs to a timer that has since been
    /// superseded or cancelled.
    pub fn complete(&mut self, expired: Expired<K>) -> Option<(K, V)> {
        let current = self
            .pending
            .get(&expired.key)
            .is_some_and(|pending| pending.generation == expired.generation);
        if !current {
            trace!("Dropping stale expiry for {:?}", expired.key);
            return None;
        }
        self.pending
            .remove(&expired.key)
            .map(|pending| (expired.key, pending.value))
    }

    /// Whether `key` has a timer running.
    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Value waiting on the timer of `key`.
    #[must_use]
    pub fn pending_value(&self, key: &K) -> Option<&V> {
        self.pending.get(key).map(|pending| &pending.value)
    }

    /// Number of keys with a running timer.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl<K, V> std::fmt::Debug for Debouncer<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tokio::time::{Instant, advance, timeout};

    const DELAY: Duration = Duration::from_millis(300);

    /// Wait for the next expiry that still resolves to a value.
    async fn next_emission(
        debouncer: &mut Debouncer<&'static str, u32>,
        rx: &mut mpsc::UnboundedReceiver<Expired<&'static str>>,
    ) -> Option<(&'static str, u32)> {
        while let Some(expired) = rx.recv().await {
            if let Some(emission) = debouncer.complete(expired) {
                return Some(emission);
            }
        }
        None
    }

    async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<Expired<&'static str>>) {
        assert!(
            timeout(Duration::from_secs(10), rx.recv()).await.is_err(),
            "no further expiry expected"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_value_emitted_after_delay() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);
        let start = Instant::now();

        debouncer.schedule("volume", 20);
        assert!(debouncer.is_pending(&"volume"));

        let emission = next_emission(&mut debouncer, &mut rx).await;
        assert_eq!(emission, Some(("volume", 20)));
        assert!(start.elapsed() >= DELAY);
        assert!(!debouncer.is_pending(&"volume"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_values_coalesce_to_last() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);

        for volume in [20, 25, 30] {
            debouncer.schedule("volume", volume);
            advance(Duration::from_millis(80)).await;
        }
        debouncer.schedule("volume", 35);
        let last_change = Instant::now();

        let emission = next_emission(&mut debouncer, &mut rx).await;
        assert_eq!(emission, Some(("volume", 35)));
        assert!(last_change.elapsed() >= DELAY);

        assert_silent(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_emission() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);

        debouncer.schedule("search", 1);
        assert_eq!(debouncer.cancel(&"search"), Some(1));
        assert_eq!(debouncer.cancel(&"search"), None);

        assert_silent(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_debounce_independently() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);

        debouncer.schedule("kitchen", 10);
        advance(Duration::from_millis(100)).await;
        debouncer.schedule("bathroom", 50);
        advance(Duration::from_millis(100)).await;
        debouncer.schedule("bathroom", 55);

        assert_eq!(debouncer.pending_count(), 2);
        assert_eq!(
            next_emission(&mut debouncer, &mut rx).await,
            Some(("kitchen", 10))
        );
        assert_eq!(
            next_emission(&mut debouncer, &mut rx).await,
            Some(("bathroom", 55))
        );
        assert_silent(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_expiry_is_rejected() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);

        debouncer.schedule("seek", 1000);
        let expired = rx.recv().await.unwrap();

        // Rescheduled after the timer woke up but before the notice was handled.
        debouncer.schedule("seek", 2000);
        assert_eq!(debouncer.complete(expired), None);
        assert_eq!(debouncer.pending_value(&"seek"), Some(&2000));

        assert_eq!(
            next_emission(&mut debouncer, &mut rx).await,
            Some(("seek", 2000))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_after_overrides_default_delay() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);
        let start = Instant::now();

        debouncer.schedule_after("seek", 5, Duration::from_millis(750));
        assert_eq!(debouncer.delay(), DELAY);

        assert_eq!(next_emission(&mut debouncer, &mut rx).await, Some(("seek", 5)));
        assert!(start.elapsed() >= Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);
        debouncer.schedule("a", 1);
        debouncer.schedule("b", 2);
        debouncer.cancel_all();
        assert_eq!(debouncer.pending_count(), 0);
        assert_silent(&mut rx).await;
    }
}
