//! Subscription lifecycle events.
//!
//! Snapshots go to [`SnapshotConsumer`](crate::publish::SnapshotConsumer)s;
//! everything else a front end might want to show (connecting, connected,
//! lost link, rejected payloads) is broadcast here.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use ridepulse_types::MetricKind;

/// Peripheral identifier for events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Platform identifier (MAC address or CoreBluetooth UUID).
    pub id: String,
    /// Advertised name if known.
    pub name: Option<String>,
}

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// Name if advertised, otherwise the identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Lifecycle events emitted by subscriptions.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum TelemetryEvent {
    /// Device selection and connection started.
    Connecting { metric: MetricKind },
    /// Notifications are enabled and samples will flow.
    Subscribed { metric: MetricKind, device: DeviceId },
    /// Connecting failed; the subscription is now `Failed`.
    ConnectFailed { metric: MetricKind, error: String },
    /// The notification stream ended without being asked to.
    ConnectionLost { metric: MetricKind },
    /// The subscription was torn down.
    Disconnected {
        metric: MetricKind,
        reason: DisconnectReason,
    },
    /// A notification payload could not be decoded and was discarded.
    SampleRejected { metric: MetricKind, error: String },
}

impl TelemetryEvent {
    /// Metric the event concerns.
    pub fn metric(&self) -> MetricKind {
        match self {
            Self::Connecting { metric }
            | Self::Subscribed { metric, .. }
            | Self::ConnectFailed { metric, .. }
            | Self::ConnectionLost { metric }
            | Self::Disconnected { metric, .. }
            | Self::SampleRejected { metric, .. } => *metric,
        }
    }
}

/// Reason a subscription was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DisconnectReason {
    /// `stop` was called.
    UserRequested,
    /// A newer subscription for the same metric took over.
    Replaced,
    /// The hub shut down.
    Shutdown,
}

/// Receiver for telemetry events.
pub type EventReceiver = broadcast::Receiver<TelemetryEvent>;

/// Fan-out of telemetry events to any number of receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<TelemetryEvent>,
}

impl EventDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn send(&self, event: TelemetryEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
