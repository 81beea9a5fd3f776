//! Acceptance-time clock for stamping samples.
//!
//! Samples are stamped when they are accepted, never with a device-reported
//! time. [`MonotonicStamp`] additionally keeps stamps from going backwards if
//! the wall clock is adjusted while a subscription is running.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Manually advanced clock for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock that starts at `start_millis`.
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    /// Set the current time.
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move the clock forward (or backward, with a negative delta).
    pub fn advance(&self, delta_millis: i64) {
        self.now.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Stamper that never returns a value lower than the previous stamp.
#[derive(Debug)]
pub struct MonotonicStamp {
    clock: SharedClock,
    last: AtomicI64,
}

impl MonotonicStamp {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            last: AtomicI64::new(i64::MIN),
        }
    }

    /// Stamp the next accepted sample.
    pub fn stamp(&self) -> i64 {
        let now = self.clock.now_millis();
        let previous = self.last.fetch_max(now, Ordering::SeqCst);
        now.max(previous)
    }

    /// Current clock reading without recording it.
    pub fn peek(&self) -> i64 {
        self.clock.now_millis()
    }
}
