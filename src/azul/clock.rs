//! Monotonic clock seam for time-bounded search.
//!
//! Search/MCTS time control polls a deadline at node/rollout boundaries.
//! `std::time::Instant` already *is* the idiomatic monotonic
//! clock in Rust, so no crate is pulled in here; the trait exists purely so
//! tests can supply a fake clock that fast-forwards deterministically
//! instead of calling `Instant::now()` directly from deep inside search.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // Relative to an arbitrary epoch fixed at first call; callers only
        // ever compare two readings from the same clock instance.
        static EPOCH: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let epoch = *EPOCH.get_or_init(Instant::now);
        Instant::now().saturating_duration_since(epoch).as_millis() as u64
    }
}

/// A deterministic fake clock for tests: advances only when told to.
pub struct FakeClock {
    millis: std::cell::Cell<u64>,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock { millis: std::cell::Cell::new(0) }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.set(self.millis.get() + by.as_millis() as u64);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.millis.get()
    }
}

/// A deadline expressed in the same units as [`Clock::now_ms`].
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    pub expires_at_ms: u64,
}

impl Deadline {
    pub fn after(clock: &dyn Clock, budget: Duration) -> Self {
        Deadline { expires_at_ms: clock.now_ms() + budget.as_millis() as u64 }
    }

    pub fn expired(&self, clock: &dyn Clock) -> bool {
        clock.now_ms() >= self.expires_at_ms
    }
}
