//! Cooperative polling schedule.
//!
//! An acquisition is driven by ticks the front-end runs on a fixed cadence.
//! Every started acquisition gets a fresh [`TickHandle`]; the acquisition only
//! honours the handle of its current generation, so a tick queued for a
//! superseded acquisition is a no-op. [`PollTimer`] holds the one pending
//! handle and replaces it on rearm.

use std::time::{Duration, Instant};

/// Tick cadence used when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Token for one scheduled tick of one acquisition generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a dropped handle means the acquisition is never polled again"]
pub struct TickHandle {
    generation: u64,
}

impl TickHandle {
    pub(crate) fn new(generation: u64) -> Self {
        Self { generation }
    }

    /// The acquisition generation this handle belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Single-slot timer: at most one tick is ever pending.
#[derive(Debug)]
pub struct PollTimer {
    interval: Duration,
    pending: Option<(TickHandle, Instant)>,
}

impl PollTimer {
    /// Creates an idle timer that schedules ticks `interval` apart.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    /// Schedules `handle` to run immediately, replacing any pending tick.
    pub fn arm_now(&mut self, handle: TickHandle, now: Instant) {
        self.pending = Some((handle, now));
    }

    /// Schedules `handle` one interval after `now`, replacing any pending tick.
    pub fn rearm(&mut self, handle: TickHandle, now: Instant) {
        self.pending = Some((handle, now + self.interval));
    }

    /// Drops the pending tick, if any.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Whether a tick is pending.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left until the pending tick is due, zero if it already is.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|(_, due)| due.saturating_duration_since(now))
    }

    /// Takes the pending handle if it is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<TickHandle> {
        match self.pending {
            Some((handle, due)) if due <= now => {
                self.pending = None;
                Some(handle)
            }
            _ => None,
        }
    }
}

impl Default for PollTimer {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_when_due() {
        let start = Instant::now();
        let mut timer = PollTimer::default();
        timer.rearm(TickHandle::new(1), start);

        assert_eq!(timer.take_due(start), None);
        assert_eq!(
            timer.time_until_due(start),
            Some(DEFAULT_POLL_INTERVAL)
        );

        let later = start + DEFAULT_POLL_INTERVAL;
        assert_eq!(timer.take_due(later), Some(TickHandle::new(1)));
        assert_eq!(timer.take_due(later), None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearm_supersedes_pending_tick() {
        let start = Instant::now();
        let mut timer = PollTimer::default();
        timer.rearm(TickHandle::new(1), start);
        timer.arm_now(TickHandle::new(2), start);

        assert_eq!(timer.take_due(start), Some(TickHandle::new(2)));
        assert_eq!(timer.take_due(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn cancel_clears() {
        let start = Instant::now();
        let mut timer = PollTimer::default();
        timer.arm_now(TickHandle::new(7), start);
        timer.cancel();
        assert_eq!(timer.take_due(start), None);
        assert_eq!(timer.time_until_due(start), None);
    }
}
