//! In-process transport for tests and demos.
//!
//! [`MockTransport`] hands out [`MockPeripheral`]s that behave like a paired
//! sensor: notifications are pushed from the test with
//! [`MockPeripheral::notify`] and the link can be dropped with
//! [`MockPeripheral::end_stream`].
//!
//! # Failure injection
//!
//! [`MockBehavior`] controls what goes wrong: aborted selection, a missing
//! service, connect or subscribe failures, and artificial latency for
//! exercising cancellation of in-flight connects.
//!
//! ```
//! use std::sync::Arc;
//! use ridepulse_core::{HubConfig, TelemetryHub};
//! use ridepulse_core::mock::MockTransport;
//! use ridepulse_types::MetricKind;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = Arc::new(MockTransport::new());
//!     let hub = TelemetryHub::new(transport.clone(), HubConfig::default()).unwrap();
//!
//!     hub.start_subscription(MetricKind::HeartRate).await.unwrap();
//!     transport.last_peripheral().unwrap().notify(vec![0x00, 72]);
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use uuid::Uuid;

use crate::error::ConnectError;
use crate::transport::{DeviceFilter, NotificationStream, SensorPeripheral, Transport};

/// What a mock transport and its peripherals should get wrong.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Selection is aborted as if the user closed the chooser.
    pub cancel_selection: bool,
    /// The selected device lacks the requested service.
    pub missing_service: bool,
    /// `connect` fails with this message.
    pub connect_error: Option<String>,
    /// `subscribe` fails with this message.
    pub subscribe_error: Option<String>,
    /// Delay before a device is returned from selection.
    pub selection_delay: Duration,
    /// Delay inside `connect`.
    pub connect_latency: Duration,
}

/// Transport that returns scripted peripherals.
pub struct MockTransport {
    device_name: String,
    behavior: RwLock<MockBehavior>,
    peripherals: Mutex<Vec<MockPeripheral>>,
    requests: AtomicU32,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("device_name", &self.device_name)
            .field("requests", &self.requests.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Transport whose devices are named "Mock Sensor" and never fail.
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::default())
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            device_name: "Mock Sensor".to_string(),
            behavior: RwLock::new(behavior),
            peripherals: Mutex::new(Vec::new()),
            requests: AtomicU32::new(0),
        }
    }

    /// Name given to every peripheral this transport creates.
    #[must_use]
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Replace the failure injection for subsequent requests.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self
            .behavior
            .write()
            .expect("mock behavior lock poisoned - a thread panicked while holding the lock") =
            behavior;
    }

    /// Number of times device selection was requested.
    pub fn request_count(&self) -> u32 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Every peripheral handed out so far, oldest first.
    pub fn peripherals(&self) -> Vec<MockPeripheral> {
        self.peripherals
            .lock()
            .expect("mock peripheral lock poisoned - a thread panicked while holding the lock")
            .clone()
    }

    /// Most recently handed out peripheral.
    pub fn last_peripheral(&self) -> Option<MockPeripheral> {
        self.peripherals
            .lock()
            .expect("mock peripheral lock poisoned - a thread panicked while holding the lock")
            .last()
            .cloned()
    }

    fn behavior(&self) -> MockBehavior {
        self.behavior
            .read()
            .expect("mock behavior lock poisoned - a thread panicked while holding the lock")
            .clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_device(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Box<dyn SensorPeripheral>, ConnectError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let behavior = self.behavior();

        if !behavior.selection_delay.is_zero() {
            tokio::time::sleep(behavior.selection_delay).await;
        }
        if behavior.cancel_selection || !filter.matches_name(Some(&self.device_name)) {
            return Err(ConnectError::UserCancelled);
        }

        let peripheral = MockPeripheral::new(&self.device_name, filter.service, behavior);
        self.peripherals
            .lock()
            .expect("mock peripheral lock poisoned - a thread panicked while holding the lock")
            .push(peripheral.clone());
        Ok(Box::new(peripheral))
    }
}

#[derive(Debug)]
struct PeripheralState {
    id: String,
    name: String,
    service: Uuid,
    behavior: MockBehavior,
    connected: AtomicBool,
    subscribed: Mutex<Option<Uuid>>,
    sender: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    connect_count: AtomicU32,
    unsubscribe_count: AtomicU32,
    disconnect_count: AtomicU32,
}

/// Scripted peripheral. Clones share state.
#[derive(Debug, Clone)]
pub struct MockPeripheral {
    state: Arc<PeripheralState>,
}

impl MockPeripheral {
    fn new(name: &str, service: Uuid, behavior: MockBehavior) -> Self {
        Self {
            state: Arc::new(PeripheralState {
                id: format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF),
                name: name.to_string(),
                service,
                behavior,
                connected: AtomicBool::new(false),
                subscribed: Mutex::new(None),
                sender: Mutex::new(None),
                connect_count: AtomicU32::new(0),
                unsubscribe_count: AtomicU32::new(0),
                disconnect_count: AtomicU32::new(0),
            }),
        }
    }

    /// Deliver a notification payload.
    ///
    /// Returns `false` if notifications are not enabled or the stream was
    /// already ended.
    pub fn notify(&self, payload: impl Into<Vec<u8>>) -> bool {
        let sender = self
            .state
            .sender
            .lock()
            .expect("mock sender lock poisoned - a thread panicked while holding the lock");
        match sender.as_ref() {
            Some(tx) => tx.unbounded_send(payload.into()).is_ok(),
            None => false,
        }
    }

    /// End the notification stream, as if the link dropped.
    pub fn end_stream(&self) {
        self.state
            .sender
            .lock()
            .expect("mock sender lock poisoned - a thread panicked while holding the lock")
            .take();
        self.state.connected.store(false, Ordering::SeqCst);
    }

    /// Service this peripheral was selected for.
    pub fn service(&self) -> Uuid {
        self.state.service
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    /// Characteristic notifications are enabled on, if any.
    pub fn subscribed_to(&self) -> Option<Uuid> {
        *self
            .state
            .subscribed
            .lock()
            .expect("mock subscription lock poisoned - a thread panicked while holding the lock")
    }

    pub fn connect_count(&self) -> u32 {
        self.state.connect_count.load(Ordering::Relaxed)
    }

    pub fn unsubscribe_count(&self) -> u32 {
        self.state.unsubscribe_count.load(Ordering::Relaxed)
    }

    pub fn disconnect_count(&self) -> u32 {
        self.state.disconnect_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SensorPeripheral for MockPeripheral {
    fn name(&self) -> Option<String> {
        Some(self.state.name.clone())
    }

    fn id(&self) -> String {
        self.state.id.clone()
    }

    async fn connect(&self) -> Result<(), ConnectError> {
        self.state.connect_count.fetch_add(1, Ordering::Relaxed);
        if !self.state.behavior.connect_latency.is_zero() {
            tokio::time::sleep(self.state.behavior.connect_latency).await;
        }
        if let Some(message) = &self.state.behavior.connect_error {
            return Err(ConnectError::transport(message));
        }
        self.state.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve(&self, service: Uuid, characteristic: Uuid) -> Result<(), ConnectError> {
        if self.state.behavior.missing_service || service != self.state.service {
            return Err(ConnectError::service_unavailable(service, characteristic));
        }
        Ok(())
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream, ConnectError> {
        if !self.is_connected() {
            return Err(ConnectError::transport("not connected"));
        }
        if let Some(message) = &self.state.behavior.subscribe_error {
            return Err(ConnectError::transport(message));
        }

        let (tx, rx) = mpsc::unbounded();
        *self
            .state
            .sender
            .lock()
            .expect("mock sender lock poisoned - a thread panicked while holding the lock") =
            Some(tx);
        *self
            .state
            .subscribed
            .lock()
            .expect("mock subscription lock poisoned - a thread panicked while holding the lock") =
            Some(characteristic);
        Ok(Box::pin(rx))
    }

    async fn unsubscribe(&self, _characteristic: Uuid) -> Result<(), ConnectError> {
        self.state.unsubscribe_count.fetch_add(1, Ordering::Relaxed);
        self.state
            .subscribed
            .lock()
            .expect("mock subscription lock poisoned - a thread panicked while holding the lock")
            .take();
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectError> {
        self.state.disconnect_count.fetch_add(1, Ordering::Relaxed);
        self.state
            .sender
            .lock()
            .expect("mock sender lock poisoned - a thread panicked while holding the lock")
            .take();
        self.state.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use ridepulse_types::uuids::{HEART_RATE_MEASUREMENT, HEART_RATE_SERVICE};

    #[tokio::test]
    async fn test_peripheral_lifecycle() {
        let transport = MockTransport::new();
        let filter = DeviceFilter::service(HEART_RATE_SERVICE);
        let device = transport.request_device(&filter).await.unwrap();
        let handle = transport.last_peripheral().unwrap();

        device.connect().await.unwrap();
        assert!(handle.is_connected());
        device
            .resolve(HEART_RATE_SERVICE, HEART_RATE_MEASUREMENT)
            .await
            .unwrap();

        let mut stream = device.subscribe(HEART_RATE_MEASUREMENT).await.unwrap();
        assert_eq!(handle.subscribed_to(), Some(HEART_RATE_MEASUREMENT));
        assert!(handle.notify(vec![0x00, 0x48]));
        assert_eq!(stream.next().await, Some(vec![0x00, 0x48]));

        handle.end_stream();
        assert_eq!(stream.next().await, None);
        assert!(!handle.notify(vec![0x00]));

        device.disconnect().await.unwrap();
        assert_eq!(handle.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_selection() {
        let transport = MockTransport::with_behavior(MockBehavior {
            cancel_selection: true,
            ..Default::default()
        });
        let err = transport
            .request_device(&DeviceFilter::service(HEART_RATE_SERVICE))
            .await
            .unwrap_err();
        assert_eq!(err, ConnectError::UserCancelled);
        assert!(transport.peripherals().is_empty());
    }

    #[tokio::test]
    async fn test_name_filter_without_match_cancels() {
        let transport = MockTransport::new().with_device_name("Polar H10");
        let filter = DeviceFilter::service(HEART_RATE_SERVICE).with_name("wahoo");
        assert_eq!(
            transport.request_device(&filter).await.unwrap_err(),
            ConnectError::UserCancelled
        );

        let filter = DeviceFilter::service(HEART_RATE_SERVICE).with_name("polar");
        assert!(transport.request_device(&filter).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_service() {
        let transport = MockTransport::with_behavior(MockBehavior {
            missing_service: true,
            ..Default::default()
        });
        let device = transport
            .request_device(&DeviceFilter::service(HEART_RATE_SERVICE))
            .await
            .unwrap();
        device.connect().await.unwrap();
        let err = device
            .resolve(HEART_RATE_SERVICE, HEART_RATE_MEASUREMENT)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::ServiceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_subscribe_requires_connection() {
        let transport = MockTransport::new();
        let device = transport
            .request_device(&DeviceFilter::service(HEART_RATE_SERVICE))
            .await
            .unwrap();
        assert!(device.subscribe(HEART_RATE_MEASUREMENT).await.is_err());
    }
}
