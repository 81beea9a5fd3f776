//! Live subscription to one metric's measurement characteristic.
//!
//! A [`StreamSubscription`] owns one peripheral link, one sliding window and
//! the last trend for a single [`MetricKind`]. Notifications are handled on a
//! dedicated task: each payload is decoded, stamped, appended and published to
//! consumers before the next one is looked at, so consumers see samples in
//! arrival order.
//!
//! State machine:
//!
//! ```text
//! Idle --connect--> Connecting --ok--> Subscribed --stream ends--> Failed("connection lost")
//!                        |                  |
//!                        +--error--> Failed  +--disconnect--> Idle
//! ```

use std::sync::{Arc, Mutex, RwLock};

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ridepulse_types::{ConnectionState, DecodeMode, MetricKind, Sample, TrendIndicator, decode};

use crate::buffer::SlidingWindowBuffer;
use crate::clock::{MonotonicStamp, SharedClock, SystemClock};
use crate::config::HubConfig;
use crate::error::ConnectError;
use crate::events::{DeviceId, DisconnectReason, EventDispatcher, TelemetryEvent};
use crate::metrics::{AtomicSubscriptionMetrics, SubscriptionMetrics};
use crate::publish::{ConsumerRegistry, Snapshot};
use crate::transport::{DeviceFilter, NotificationStream, SensorPeripheral, Transport};
use crate::trend::TrendCalculator;

/// Reason recorded when the notification stream ends on its own.
pub const CONNECTION_LOST: &str = "connection lost";

/// Collaborators a subscription publishes through.
#[derive(Debug, Clone)]
pub struct SubscriptionContext {
    pub config: HubConfig,
    pub clock: SharedClock,
    pub consumers: Arc<ConsumerRegistry>,
    pub events: EventDispatcher,
    /// Optional case-insensitive device name filter.
    pub name_filter: Option<String>,
}

impl SubscriptionContext {
    /// Context with its own consumer registry and event channel.
    pub fn new(config: HubConfig) -> Self {
        let events = EventDispatcher::new(config.event_capacity);
        Self {
            config,
            clock: Arc::new(SystemClock),
            consumers: Arc::new(ConsumerRegistry::new()),
            events,
            name_filter: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_name_filter(mut self, name: Option<String>) -> Self {
        self.name_filter = name;
        self
    }
}

impl Default for SubscriptionContext {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[derive(Debug)]
struct Window {
    buffer: SlidingWindowBuffer,
    trend: Option<TrendIndicator>,
}

/// State shared between the subscription and its notification task.
#[derive(Debug)]
struct Shared {
    metric: MetricKind,
    decode_mode: DecodeMode,
    window: RwLock<Window>,
    state: RwLock<ConnectionState>,
    device: RwLock<Option<DeviceId>>,
    stamper: MonotonicStamp,
    metrics: AtomicSubscriptionMetrics,
    consumers: Arc<ConsumerRegistry>,
    events: EventDispatcher,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        *self
            .state
            .write()
            .expect("subscription state lock poisoned - a thread panicked while holding the lock") =
            state;
    }

    fn state(&self) -> ConnectionState {
        self.state
            .read()
            .expect("subscription state lock poisoned - a thread panicked while holding the lock")
            .clone()
    }

    fn snapshot(&self) -> Snapshot {
        let window = self
            .window
            .read()
            .expect("subscription window lock poisoned - a thread panicked while holding the lock");
        Snapshot {
            metric: self.metric,
            samples: window.buffer.snapshot(),
            trend: window.trend,
        }
    }

    /// Decode one payload and publish the resulting snapshot.
    ///
    /// Returns the accepted sample, or `None` if the payload was discarded.
    fn handle_notification(&self, payload: &[u8], token: &CancellationToken) -> Option<Sample> {
        let value = match decode::decode_with(self.decode_mode, self.metric, payload) {
            Ok(value) => value,
            Err(e) => {
                self.metrics.record_decode_failure();
                debug!(metric = %self.metric, error = %e, "Discarding notification");
                self.events.send(TelemetryEvent::SampleRejected {
                    metric: self.metric,
                    error: e.to_string(),
                });
                return None;
            }
        };

        // Teardown has started; nothing may be published past this point.
        if token.is_cancelled() {
            return None;
        }

        let sample = Sample::new(self.stamper.stamp(), value);
        let snapshot = {
            let mut window = self.window.write().expect(
                "subscription window lock poisoned - a thread panicked while holding the lock",
            );
            // Read before appending: a capacity-1 window evicts it.
            let previous = window.buffer.latest();
            window.buffer.append(sample);
            // No indicator until two samples were accepted.
            window.trend = previous.map(|_| TrendCalculator::update(sample, previous));
            Snapshot {
                metric: self.metric,
                samples: window.buffer.snapshot(),
                trend: window.trend,
            }
        };
        self.metrics.record_accepted();

        debug!(metric = %self.metric, value, trend = ?snapshot.trend, "Accepted sample");
        self.consumers.publish(self.metric, &snapshot);
        self.metrics.record_published();
        Some(sample)
    }

    fn connection_lost(&self) {
        warn!(metric = %self.metric, "Notification stream ended");
        self.set_state(ConnectionState::Failed(CONNECTION_LOST.to_string()));
        self.events.send(TelemetryEvent::ConnectionLost {
            metric: self.metric,
        });
    }
}

/// Open peripheral link plus its notification task.
#[derive(Debug)]
struct Link {
    peripheral: Arc<dyn SensorPeripheral>,
    pump: JoinHandle<()>,
    token: CancellationToken,
}

/// Subscription to one metric's notifications.
///
/// Construct with [`StreamSubscription::new`], then call
/// [`connect`](Self::connect). A [`TelemetryHub`](crate::TelemetryHub)
/// manages this for you and guarantees at most one subscription per metric.
pub struct StreamSubscription {
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    filter: DeviceFilter,
    /// Cancelled once this subscription has been replaced or shut down.
    retired: CancellationToken,
    /// Token for the current connect attempt and the link it produces.
    attempt: Mutex<CancellationToken>,
    link: tokio::sync::Mutex<Option<Link>>,
}

impl std::fmt::Debug for StreamSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSubscription")
            .field("metric", &self.shared.metric)
            .field("state", &self.shared.state())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl StreamSubscription {
    /// Create an idle subscription for `metric`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if `context.config` does not validate.
    pub fn new(
        metric: MetricKind,
        transport: Arc<dyn Transport>,
        context: SubscriptionContext,
    ) -> crate::Result<Self> {
        context.config.validate()?;
        Ok(Self::with_valid_config(metric, transport, context))
    }

    /// Constructor for callers that already validated the config.
    pub(crate) fn with_valid_config(
        metric: MetricKind,
        transport: Arc<dyn Transport>,
        context: SubscriptionContext,
    ) -> Self {
        let stamper = MonotonicStamp::new(context.clock);
        let buffer = if context.config.prefill {
            SlidingWindowBuffer::prefilled(context.config.capacity, stamper.peek())
        } else {
            SlidingWindowBuffer::new(context.config.capacity)
        };

        let mut filter = DeviceFilter::service(metric.service());
        if let Some(name) = context.name_filter {
            filter = filter.with_name(name);
        }

        let retired = CancellationToken::new();
        let attempt = retired.child_token();

        Self {
            shared: Arc::new(Shared {
                metric,
                decode_mode: context.config.decode_mode,
                window: RwLock::new(Window {
                    buffer,
                    trend: None,
                }),
                state: RwLock::new(ConnectionState::Idle),
                device: RwLock::new(None),
                stamper,
                metrics: AtomicSubscriptionMetrics::new(),
                consumers: context.consumers,
                events: context.events,
            }),
            transport,
            filter,
            retired,
            attempt: Mutex::new(attempt),
            link: tokio::sync::Mutex::new(None),
        }
    }

    pub fn metric(&self) -> MetricKind {
        self.shared.metric
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Current window and trend.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    pub fn metrics(&self) -> SubscriptionMetrics {
        self.shared.metrics.snapshot()
    }

    /// Peripheral currently or most recently linked.
    pub fn device(&self) -> Option<DeviceId> {
        self.shared
            .device
            .read()
            .expect("subscription device lock poisoned - a thread panicked while holding the lock")
            .clone()
    }

    pub fn device_name(&self) -> Option<String> {
        self.device().and_then(|d| d.name)
    }

    /// Device filter used during selection.
    pub fn filter(&self) -> &DeviceFilter {
        &self.filter
    }

    /// Whether this subscription has been retired for good.
    pub fn is_retired(&self) -> bool {
        self.retired.is_cancelled()
    }

    /// Abort an in-flight connect attempt, if any.
    ///
    /// The attempt returns [`ConnectError::UserCancelled`]. Does not tear down
    /// an established link; use [`disconnect`](Self::disconnect) for that.
    pub fn cancel_pending(&self) {
        self.attempt
            .lock()
            .expect("subscription attempt lock poisoned - a thread panicked while holding the lock")
            .cancel();
    }

    /// Permanently retire this subscription.
    ///
    /// Any in-flight or future connect fails with
    /// [`ConnectError::UserCancelled`] and the notification task stops
    /// publishing.
    pub fn retire(&self) {
        self.retired.cancel();
    }

    fn fresh_attempt(&self) -> CancellationToken {
        let mut attempt = self
            .attempt
            .lock()
            .expect("subscription attempt lock poisoned - a thread panicked while holding the lock");
        *attempt = self.retired.child_token();
        attempt.clone()
    }

    /// Select a device, connect, and start handling notifications.
    ///
    /// Calling this on an already subscribed subscription is a no-op. On
    /// failure any opened peripheral is disconnected before returning and the
    /// state becomes [`ConnectionState::Failed`].
    #[tracing::instrument(level = "info", skip(self), fields(metric = %self.shared.metric))]
    pub async fn connect(&self) -> Result<(), ConnectError> {
        let mut link = self.link.lock().await;

        if let Some(existing) = link.take() {
            if !existing.pump.is_finished() && !existing.token.is_cancelled() {
                *link = Some(existing);
                return Ok(());
            }
            // Stale link from a lost connection.
            teardown(existing, self.shared.metric.characteristic()).await;
        }

        let token = self.fresh_attempt();
        if token.is_cancelled() {
            return Err(self.fail(ConnectError::UserCancelled));
        }

        let metric = self.shared.metric;
        self.shared.set_state(ConnectionState::Connecting);
        self.shared
            .events
            .send(TelemetryEvent::Connecting { metric });
        info!("Connecting");

        let mut opened: Option<Arc<dyn SensorPeripheral>> = None;
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(ConnectError::UserCancelled),
            r = self.establish(&mut opened) => r,
        };

        match result {
            Ok(stream) => {
                let Some(peripheral) = opened else {
                    return Err(self.fail(ConnectError::transport("no peripheral opened")));
                };
                let device = match peripheral.name() {
                    Some(name) => DeviceId::with_name(peripheral.id(), name),
                    None => DeviceId::new(peripheral.id()),
                };
                info!(device = %device.display_name(), "Subscribed");

                *self.shared.device.write().expect(
                    "subscription device lock poisoned - a thread panicked while holding the lock",
                ) = Some(device.clone());
                self.shared.set_state(ConnectionState::Subscribed);

                let pump = tokio::spawn(pump(
                    Arc::clone(&self.shared),
                    stream,
                    token.clone(),
                ));
                *link = Some(Link {
                    peripheral,
                    pump,
                    token,
                });

                self.shared
                    .events
                    .send(TelemetryEvent::Subscribed { metric, device });
                Ok(())
            }
            Err(e) => {
                if let Some(peripheral) = opened {
                    if let Err(err) = peripheral.disconnect().await {
                        warn!(error = %err, "Disconnect after failed connect failed");
                    }
                }
                Err(self.fail(e))
            }
        }
    }

    async fn establish(
        &self,
        opened: &mut Option<Arc<dyn SensorPeripheral>>,
    ) -> Result<NotificationStream, ConnectError> {
        let service = self.shared.metric.service();
        let characteristic = self.shared.metric.characteristic();

        let peripheral: Arc<dyn SensorPeripheral> =
            Arc::from(self.transport.request_device(&self.filter).await?);
        *opened = Some(Arc::clone(&peripheral));
        debug!(id = %peripheral.id(), name = ?peripheral.name(), "Device selected");

        peripheral.connect().await?;
        peripheral.resolve(service, characteristic).await?;
        peripheral.subscribe(characteristic).await
    }

    fn fail(&self, error: ConnectError) -> ConnectError {
        warn!(metric = %self.shared.metric, error = %error, "Connect failed");
        self.shared
            .set_state(ConnectionState::Failed(error.to_string()));
        self.shared.events.send(TelemetryEvent::ConnectFailed {
            metric: self.shared.metric,
            error: error.to_string(),
        });
        error
    }

    /// Stop notifications and close the link.
    ///
    /// Waits for the notification task to finish, so no snapshot is
    /// published after this returns. The window is kept and stays readable.
    /// The state becomes `Idle`.
    #[tracing::instrument(level = "info", skip(self), fields(metric = %self.shared.metric))]
    pub async fn disconnect(&self, reason: DisconnectReason) {
        self.cancel_pending();
        let mut link = self.link.lock().await;

        let had_link = match link.take() {
            Some(existing) => {
                teardown(existing, self.shared.metric.characteristic()).await;
                true
            }
            None => false,
        };

        let was = self.shared.state();
        self.shared.set_state(ConnectionState::Idle);
        if had_link || was.is_active() {
            info!(?reason, "Disconnected");
            self.shared.events.send(TelemetryEvent::Disconnected {
                metric: self.shared.metric,
                reason,
            });
        }
    }
}

/// Stop the notification task, then unsubscribe and close the link.
async fn teardown(link: Link, characteristic: Uuid) {
    link.token.cancel();
    if let Err(e) = link.pump.await {
        debug!(error = %e, "Notification task ended abnormally");
    }
    if let Err(e) = link.peripheral.unsubscribe(characteristic).await {
        warn!(error = %e, "Unsubscribe failed (device may already be gone)");
    }
    if let Err(e) = link.peripheral.disconnect().await {
        warn!(error = %e, "Disconnect failed (device may already be gone)");
    }
}

async fn pump(shared: Arc<Shared>, mut stream: NotificationStream, token: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(metric = %shared.metric, "Notification task cancelled");
                break;
            }
            next = stream.next() => match next {
                Some(payload) => {
                    shared.handle_notification(&payload, &token);
                }
                None => {
                    if !token.is_cancelled() {
                        shared.connection_lost();
                    }
                    break;
                }
            }
        }
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.retired.cancel();

        let Ok(mut link) = self.link.try_lock() else {
            return;
        };
        let Some(existing) = link.take() else {
            return;
        };

        warn!(
            metric = %self.shared.metric,
            "Subscription dropped while linked - performing best-effort cleanup. \
             Call disconnect().await before dropping for reliable cleanup."
        );
        existing.pump.abort();

        let peripheral = existing.peripheral;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = peripheral.disconnect().await {
                    debug!(error = %e, "Best-effort disconnect failed");
                }
            });
        }
    }
}
