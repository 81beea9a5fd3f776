//! Live telemetry core for BLE heart-rate and cycling power sensors.
//!
//! This crate subscribes to a sensor's measurement notifications, decodes each
//! payload into a timestamped [`Sample`], keeps a bounded sliding window of
//! recent samples per metric, derives a trend arrow between consecutive
//! samples, and pushes a fresh [`Snapshot`] to every registered consumer once
//! per accepted sample.
//!
//! # Features
//!
//! - **One subscription per metric**: heart rate and power run independently
//! - **Last writer wins**: starting a metric again replaces the old link,
//!   cancelling an in-flight connect if there is one
//! - **Bounded history**: fixed-capacity FIFO window, 200 samples by default
//! - **Pluggable transport**: btleplug on native platforms, an in-process mock
//!   for tests
//! - **Lifecycle events**: broadcast channel of connect, loss and teardown
//!   events
//!
//! # Supported Sensors
//!
//! | Metric | Service | Characteristic | Unit |
//! |--------|---------|----------------|------|
//! | Heart rate | `0x180D` | `0x2A37` Heart Rate Measurement | bpm |
//! | Power | `0x1818` | `0x2A63` Cycling Power Measurement | W |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ridepulse_core::{BleTransport, HubConfig, Snapshot, TelemetryHub};
//! use ridepulse_types::MetricKind;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HubConfig::default();
//!     let transport = BleTransport::new(config.scan_duration).await?;
//!     let hub = TelemetryHub::new(Arc::new(transport), config)?;
//!
//!     hub.register_consumer(MetricKind::HeartRate, |metric: MetricKind, snapshot: &Snapshot| {
//!         if let (Some(latest), Some(trend)) = (snapshot.latest(), snapshot.trend) {
//!             println!("{} {}{} {}", metric.label(), latest.value(), metric.unit(), trend);
//!         }
//!     });
//!
//!     hub.start_subscription(MetricKind::HeartRate).await?;
//!     tokio::time::sleep(Duration::from_secs(60)).await;
//!     hub.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod buffer;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod hub;
pub mod metrics;
pub mod mock;
pub mod publish;
pub mod subscription;
pub mod transport;
pub mod trend;

// Core exports
pub use ble::{BleTransport, DeviceSelector, DiscoveredSensor, StrongestSignal, scan_sensors};
pub use buffer::{DEFAULT_CAPACITY, SlidingWindowBuffer};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{HubConfig, HubConfigBuilder};
pub use error::{ConnectError, Error, Result};
pub use events::{DeviceId, DisconnectReason, EventDispatcher, EventReceiver, TelemetryEvent};
pub use hub::{SubscriptionHandle, TelemetryHub};
pub use metrics::SubscriptionMetrics;
pub use mock::{MockBehavior, MockPeripheral, MockTransport};
pub use publish::{ConsumerId, Snapshot, SnapshotConsumer};
pub use subscription::{StreamSubscription, SubscriptionContext};
pub use transport::{DeviceFilter, NotificationStream, SensorPeripheral, Transport};
pub use trend::TrendCalculator;

// Re-export from ridepulse-types
pub use ridepulse_types::uuid as uuids;
pub use ridepulse_types::{
    ConnectionState, DecodeError, DecodeMode, MetricKind, Sample, TrendIndicator,
};
