//! The set of live subscriptions, one per metric kind.
//!
//! [`TelemetryHub`] is what a front end talks to: it starts and stops
//! subscriptions, owns the consumer registry and the event channel, and
//! serves snapshots. Transitions for one metric are serialized by a per-metric
//! async lock; heart rate and power never wait on each other.
//!
//! Starting a subscription for a metric that already has one replaces it
//! (last writer wins). The old subscription is cancelled first, including a
//! connect that is still in flight, and fully torn down before the new one
//! connects. Once `start_subscription` or `stop` returns, the old subscription
//! publishes nothing more.

use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use ridepulse_types::{ConnectionState, MetricKind};

use crate::clock::{SharedClock, SystemClock};
use crate::config::HubConfig;
use crate::error::{ConnectError, Error, Result};
use crate::events::{DeviceId, DisconnectReason, EventDispatcher, EventReceiver};
use crate::metrics::SubscriptionMetrics;
use crate::publish::{ConsumerId, ConsumerRegistry, Snapshot, SnapshotConsumer};
use crate::subscription::{StreamSubscription, SubscriptionContext};
use crate::transport::Transport;

/// Read-only view of a subscription created by the hub.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    inner: Arc<StreamSubscription>,
}

impl SubscriptionHandle {
    pub fn metric(&self) -> MetricKind {
        self.inner.metric()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    pub fn metrics(&self) -> SubscriptionMetrics {
        self.inner.metrics()
    }

    pub fn device(&self) -> Option<DeviceId> {
        self.inner.device()
    }

    pub fn device_name(&self) -> Option<String> {
        self.inner.device_name()
    }

    /// Whether this subscription has been replaced or shut down.
    pub fn is_retired(&self) -> bool {
        self.inner.is_retired()
    }
}

#[derive(Debug, Default)]
struct MetricSlot {
    current: RwLock<Option<Arc<StreamSubscription>>>,
    name_filter: RwLock<Option<String>>,
    transition: tokio::sync::Mutex<()>,
}

impl MetricSlot {
    fn current(&self) -> Option<Arc<StreamSubscription>> {
        self.current
            .read()
            .expect("hub slot lock poisoned - a thread panicked while holding the lock")
            .clone()
    }

    fn replace(&self, next: Option<Arc<StreamSubscription>>) -> Option<Arc<StreamSubscription>> {
        let mut current = self
            .current
            .write()
            .expect("hub slot lock poisoned - a thread panicked while holding the lock");
        std::mem::replace(&mut *current, next)
    }

    fn name_filter(&self) -> Option<String> {
        self.name_filter
            .read()
            .expect("hub slot lock poisoned - a thread panicked while holding the lock")
            .clone()
    }
}

/// Owner of the per-metric subscriptions.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ridepulse_core::{HubConfig, Snapshot, TelemetryHub};
/// use ridepulse_core::mock::MockTransport;
/// use ridepulse_types::MetricKind;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let transport = Arc::new(MockTransport::new());
///     let hub = TelemetryHub::new(transport, HubConfig::default())?;
///
///     hub.register_consumer(MetricKind::Power, |metric: MetricKind, snapshot: &Snapshot| {
///         if let Some(latest) = snapshot.latest() {
///             println!("{} {}{}", metric.label(), latest.value(), metric.unit());
///         }
///     });
///
///     let handle = hub.start_subscription(MetricKind::Power).await?;
///     assert!(handle.state().is_active());
///
///     hub.stop(MetricKind::Power).await?;
///     Ok(())
/// }
/// ```
pub struct TelemetryHub {
    transport: Arc<dyn Transport>,
    config: HubConfig,
    clock: SharedClock,
    consumers: Arc<ConsumerRegistry>,
    events: EventDispatcher,
    heart_rate: MetricSlot,
    power: MetricSlot,
}

impl std::fmt::Debug for TelemetryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHub")
            .field("config", &self.config)
            .field("consumers", &self.consumers)
            .field("heart_rate", &self.heart_rate.current())
            .field("power", &self.power.current())
            .finish_non_exhaustive()
    }
}

impl TelemetryHub {
    /// Create a hub over `transport`.
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(transport: Arc<dyn Transport>, config: HubConfig) -> Result<Self> {
        config.validate()?;
        let events = EventDispatcher::new(config.event_capacity);
        Ok(Self {
            transport,
            config,
            clock: Arc::new(SystemClock),
            consumers: Arc::new(ConsumerRegistry::new()),
            events,
            heart_rate: MetricSlot::default(),
            power: MetricSlot::default(),
        })
    }

    /// Use `clock` to stamp samples of subscriptions started from now on.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Only offer devices whose name contains `name` when selecting for
    /// `metric`. Applies to subscriptions started from now on.
    pub fn set_name_filter(&self, metric: MetricKind, name: Option<String>) {
        *self
            .slot(metric)
            .name_filter
            .write()
            .expect("hub slot lock poisoned - a thread panicked while holding the lock") = name;
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    fn slot(&self, metric: MetricKind) -> &MetricSlot {
        match metric {
            MetricKind::HeartRate => &self.heart_rate,
            MetricKind::Power => &self.power,
        }
    }

    fn context(&self, metric: MetricKind) -> SubscriptionContext {
        SubscriptionContext {
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
            consumers: Arc::clone(&self.consumers),
            events: self.events.clone(),
            name_filter: self.slot(metric).name_filter(),
        }
    }

    /// Start a subscription for `metric`, replacing any existing one.
    ///
    /// The new subscription becomes current immediately, so
    /// [`current_snapshot`](Self::current_snapshot) reflects it even while it
    /// is connecting. If another `start_subscription` for the same metric
    /// supersedes this one before it connects, this call returns
    /// [`ConnectError::UserCancelled`].
    #[tracing::instrument(level = "info", skip_all, fields(metric = %metric))]
    pub async fn start_subscription(
        &self,
        metric: MetricKind,
    ) -> std::result::Result<SubscriptionHandle, ConnectError> {
        let slot = self.slot(metric);
        let next = Arc::new(StreamSubscription::with_valid_config(
            metric,
            Arc::clone(&self.transport),
            self.context(metric),
        ));

        let previous = slot.replace(Some(Arc::clone(&next)));
        if let Some(old) = &previous {
            debug!("Cancelling previous subscription");
            old.retire();
        }

        let _transition = slot.transition.lock().await;
        if let Some(old) = previous {
            old.disconnect(DisconnectReason::Replaced).await;
        }

        next.connect().await?;
        info!("Subscription started");
        Ok(SubscriptionHandle { inner: next })
    }

    /// Disconnect the current subscription for `metric`.
    ///
    /// The subscription stays in the hub in the `Idle` state and its window
    /// stays readable. Returns [`Error::NotSubscribed`] if the metric was
    /// never started.
    #[tracing::instrument(level = "info", skip_all, fields(metric = %metric))]
    pub async fn stop(&self, metric: MetricKind) -> Result<()> {
        let slot = self.slot(metric);
        let Some(current) = slot.current() else {
            return Err(Error::NotSubscribed(metric));
        };

        current.cancel_pending();
        let _transition = slot.transition.lock().await;
        current.disconnect(DisconnectReason::UserRequested).await;
        Ok(())
    }

    /// Stop and discard every subscription.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn shutdown(&self) {
        for metric in MetricKind::ALL {
            let slot = self.slot(metric);
            let Some(current) = slot.replace(None) else {
                continue;
            };
            current.retire();
            let _transition = slot.transition.lock().await;
            current.disconnect(DisconnectReason::Shutdown).await;
        }
        info!("Telemetry hub shut down");
    }

    /// Window and trend of the current subscription for `metric`.
    pub fn current_snapshot(&self, metric: MetricKind) -> Option<Snapshot> {
        self.slot(metric).current().map(|s| s.snapshot())
    }

    pub fn state(&self, metric: MetricKind) -> Option<ConnectionState> {
        self.slot(metric).current().map(|s| s.state())
    }

    pub fn metrics(&self, metric: MetricKind) -> Option<SubscriptionMetrics> {
        self.slot(metric).current().map(|s| s.metrics())
    }

    /// Handle to the current subscription for `metric`.
    pub fn subscription(&self, metric: MetricKind) -> Option<SubscriptionHandle> {
        self.slot(metric)
            .current()
            .map(|inner| SubscriptionHandle { inner })
    }

    /// Receive every snapshot published for `metric`.
    pub fn register_consumer<C>(&self, metric: MetricKind, consumer: C) -> ConsumerId
    where
        C: SnapshotConsumer + 'static,
    {
        self.consumers.register(metric, Arc::new(consumer))
    }

    pub fn register_shared_consumer(
        &self,
        metric: MetricKind,
        consumer: Arc<dyn SnapshotConsumer>,
    ) -> ConsumerId {
        self.consumers.register(metric, consumer)
    }

    pub fn unregister_consumer(&self, id: ConsumerId) -> bool {
        self.consumers.unregister(id)
    }

    /// Subscribe to lifecycle events.
    pub fn events(&self) -> EventReceiver {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBehavior, MockTransport};

    #[test]
    fn test_invalid_config_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        let config = HubConfig::builder().capacity(0).build();
        let err = TelemetryHub::new(transport, config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_never_started_metric() {
        let hub = TelemetryHub::new(Arc::new(MockTransport::new()), HubConfig::default()).unwrap();
        assert!(hub.current_snapshot(MetricKind::HeartRate).is_none());
        assert!(hub.state(MetricKind::Power).is_none());
        assert!(matches!(
            hub.stop(MetricKind::Power).await,
            Err(Error::NotSubscribed(MetricKind::Power))
        ));
    }

    #[tokio::test]
    async fn test_failed_start_stays_current() {
        let transport = Arc::new(MockTransport::with_behavior(MockBehavior {
            connect_error: Some("adapter off".to_string()),
            ..Default::default()
        }));
        let hub = TelemetryHub::new(transport, HubConfig::default()).unwrap();

        let err = hub.start_subscription(MetricKind::HeartRate).await.unwrap_err();
        assert_eq!(err, ConnectError::TransportError("adapter off".to_string()));
        assert!(matches!(
            hub.state(MetricKind::HeartRate),
            Some(ConnectionState::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_name_filter_reaches_transport() {
        let transport = Arc::new(MockTransport::new().with_device_name("Polar H10"));
        let hub = TelemetryHub::new(transport.clone(), HubConfig::default()).unwrap();

        hub.set_name_filter(MetricKind::HeartRate, Some("garmin".to_string()));
        assert_eq!(
            hub.start_subscription(MetricKind::HeartRate).await.unwrap_err(),
            ConnectError::UserCancelled
        );

        hub.set_name_filter(MetricKind::HeartRate, Some("polar".to_string()));
        let handle = hub.start_subscription(MetricKind::HeartRate).await.unwrap();
        assert_eq!(handle.device_name().as_deref(), Some("Polar H10"));
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_discards_subscriptions() {
        let transport = Arc::new(MockTransport::new());
        let hub = TelemetryHub::new(transport.clone(), HubConfig::default()).unwrap();

        let handle = hub.start_subscription(MetricKind::Power).await.unwrap();
        hub.shutdown().await;

        assert!(handle.is_retired());
        assert_eq!(handle.state(), ConnectionState::Idle);
        assert!(hub.current_snapshot(MetricKind::Power).is_none());
        assert!(!transport.last_peripheral().unwrap().is_connected());
    }
}
