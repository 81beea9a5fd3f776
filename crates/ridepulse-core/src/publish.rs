//! Push interface from the telemetry core to renderers.
//!
//! Every accepted sample produces exactly one [`Snapshot`], delivered
//! synchronously to every consumer registered for that metric. There is no
//! batching or coalescing.
//!
//! ```
//! use std::sync::Arc;
//! use ridepulse_core::publish::{ConsumerRegistry, Snapshot};
//! use ridepulse_types::{MetricKind, Sample};
//!
//! let registry = ConsumerRegistry::new();
//! let id = registry.register(MetricKind::HeartRate, Arc::new(|metric: MetricKind, snapshot: &Snapshot| {
//!     if let Some(latest) = snapshot.latest() {
//!         println!("{}: {}{}", metric.label(), latest.value(), metric.unit());
//!     }
//! }));
//! assert_eq!(registry.count(MetricKind::HeartRate), 1);
//! registry.unregister(id);
//! ```

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use ridepulse_types::{MetricKind, Sample, TrendIndicator};

/// Consistent point-in-time view of one metric's window and trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Metric the samples belong to.
    pub metric: MetricKind,
    /// Buffered samples, oldest first.
    pub samples: Vec<Sample>,
    /// Trend between the two most recently accepted samples, if any.
    pub trend: Option<TrendIndicator>,
}

impl Snapshot {
    /// Most recent sample.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.last().copied()
    }

    /// Sample values, oldest first.
    pub fn values(&self) -> Vec<i32> {
        self.samples.iter().map(Sample::value).collect()
    }

    /// Sample timestamps, oldest first.
    pub fn timestamps(&self) -> Vec<i64> {
        self.samples.iter().map(Sample::timestamp).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Receiver of snapshot updates.
///
/// Called on the metric's notification task; implementations should return
/// quickly and must not block on hub operations for the same metric.
pub trait SnapshotConsumer: Send + Sync {
    /// A new sample was accepted for `metric`.
    fn on_snapshot_updated(&self, metric: MetricKind, snapshot: &Snapshot);
}

impl<F> SnapshotConsumer for F
where
    F: Fn(MetricKind, &Snapshot) + Send + Sync,
{
    fn on_snapshot_updated(&self, metric: MetricKind, snapshot: &Snapshot) {
        self(metric, snapshot)
    }
}

/// Handle returned by [`ConsumerRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

struct Registration {
    id: ConsumerId,
    metric: MetricKind,
    consumer: Arc<dyn SnapshotConsumer>,
}

/// Registered consumers, keyed by metric.
#[derive(Default)]
pub struct ConsumerRegistry {
    next_id: AtomicU64,
    registrations: RwLock<Vec<Registration>>,
}

impl std::fmt::Debug for ConsumerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerRegistry")
            .field("consumers", &self.len())
            .finish()
    }
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `consumer` for updates on `metric`.
    pub fn register(&self, metric: MetricKind, consumer: Arc<dyn SnapshotConsumer>) -> ConsumerId {
        let id = ConsumerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations
            .write()
            .expect("consumer registry lock poisoned - a thread panicked while holding the lock")
            .push(Registration {
                id,
                metric,
                consumer,
            });
        id
    }

    /// Remove a consumer. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ConsumerId) -> bool {
        let mut registrations = self
            .registrations
            .write()
            .expect("consumer registry lock poisoned - a thread panicked while holding the lock");
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    /// Deliver `snapshot` to every consumer of `metric`.
    ///
    /// Consumers are invoked outside the registry lock, so they may register
    /// or unregister consumers themselves. Returns the number of consumers
    /// invoked.
    pub fn publish(&self, metric: MetricKind, snapshot: &Snapshot) -> usize {
        let targets: Vec<Arc<dyn SnapshotConsumer>> = {
            let registrations = self.registrations.read().expect(
                "consumer registry lock poisoned - a thread panicked while holding the lock",
            );
            registrations
                .iter()
                .filter(|r| r.metric == metric)
                .map(|r| Arc::clone(&r.consumer))
                .collect()
        };

        for consumer in &targets {
            consumer.on_snapshot_updated(metric, snapshot);
        }
        targets.len()
    }

    /// Number of consumers registered for `metric`.
    pub fn count(&self, metric: MetricKind) -> usize {
        self.registrations
            .read()
            .expect("consumer registry lock poisoned - a thread panicked while holding the lock")
            .iter()
            .filter(|r| r.metric == metric)
            .count()
    }

    /// Total number of registered consumers.
    pub fn len(&self) -> usize {
        self.registrations
            .read()
            .expect("consumer registry lock poisoned - a thread panicked while holding the lock")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
