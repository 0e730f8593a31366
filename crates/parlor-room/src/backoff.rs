//! Bounded exponential backoff with jitter for the observe loop.
//!
//! The long-poll provides the loop's pacing when the service is
//! healthy. When it isn't, retrying immediately turns an outage into a
//! hot loop against the remote service — so consecutive failures wait
//! increasingly long, up to a cap, with a little jitter so a fleet of
//! rooms doesn't retry in lockstep.

use std::time::Duration;

use rand::Rng;

/// Exponential retry delay: `base, 2*base, 4*base, …` capped at `cap`,
/// each with up to 25% added jitter. [`reset`](Self::reset) after any
/// success.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    next: Duration,
}

impl Backoff {
    /// A backoff starting at `base` and never exceeding `cap` (before
    /// jitter).
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            next: base,
        }
    }

    /// Returns the delay to wait before the next retry and advances
    /// the schedule.
    pub fn delay(&mut self) -> Duration {
        let current = self.next;
        self.next = (current * 2).min(self.cap);

        let jitter_ceiling = (current.as_millis() as u64) / 4;
        let jitter = Duration::from_millis(rand::rng().random_range(0..=jitter_ceiling));
        current + jitter
    }

    /// Back to the base delay. Call after a successful operation.
    pub fn reset(&mut self) {
        self.next = self.base;
    }
}

// =========================================================================
// Tests
// =========================================================================
