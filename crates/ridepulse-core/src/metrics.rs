//! Per-subscription notification counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of a subscription's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMetrics {
    /// Notifications decoded and appended to the window.
    pub accepted: u64,
    /// Notifications discarded because the payload was malformed.
    pub decode_failures: u64,
    /// Snapshots published to consumers.
    pub published: u64,
}

impl SubscriptionMetrics {
    /// Total notifications received.
    pub fn received(&self) -> u64 {
        self.accepted + self.decode_failures
    }

    /// Fraction of notifications rejected, or `None` if nothing arrived.
    pub fn rejection_rate(&self) -> Option<f64> {
        let received = self.received();
        if received == 0 {
            None
        } else {
            Some(self.decode_failures as f64 / received as f64)
        }
    }
}

/// Thread-safe counters updated from the notification task.
#[derive(Debug, Default)]
pub struct AtomicSubscriptionMetrics {
    accepted: AtomicU64,
    decode_failures: AtomicU64,
    published: AtomicU64,
}

impl AtomicSubscriptionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SubscriptionMetrics {
        SubscriptionMetrics {
            accepted: self.accepted.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
        }
    }
}
