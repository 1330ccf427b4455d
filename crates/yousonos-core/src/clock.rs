//! Elapsed playback time of the current track.

use tracing::debug;

/// Mirror of the server's playback position.
///
/// After a local seek the clock ignores `player_time` ticks, which still
/// describe the old position, until the server confirms the seek with a
/// `player_time_update_activation` push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    time_ms: u64,
    tracking: bool,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            time_ms: 0,
            tracking: true,
        }
    }
}

impl PlaybackClock {
    /// Create a clock at position zero, tracking server ticks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Displayed position in milliseconds.
    #[must_use]
    pub const fn time_ms(&self) -> u64 {
        self.time_ms
    }

    /// Whether server ticks are applied.
    #[must_use]
    pub const fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Apply a `player_time` tick. Returns whether it was applied.
    pub fn on_player_time(&mut self, time_ms: u64) -> bool {
        if self.tracking {
            self.time_ms = time_ms;
        }
        self.tracking
    }

    /// Apply a `player_time_update_activation` push and resume tracking.
    pub fn on_activation(&mut self, time_ms: u64) {
        debug!("Player time tracking resumed at {} ms", time_ms);
        self.time_ms = time_ms;
        self.tracking = true;
    }

    /// Jump to `target_ms` locally and suspend tracking. Negative targets become zero.
    pub fn seek(&mut self, target_ms: i64) -> u64 {
        self.time_ms = target_ms.max(0) as u64;
        self.tracking = false;
        self.time_ms
    }

    /// Jump by `delta_ms` relative to the displayed position.
    pub fn skip(&mut self, delta_ms: i64) -> u64 {
        let current = i64::try_from(self.time_ms).unwrap_or(i64::MAX);
        self.seek(current.saturating_add(delta_ms))
    }
}
