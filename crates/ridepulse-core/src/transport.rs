//! Trait abstractions over the wireless peripheral stack.
//!
//! The telemetry core only needs a handful of operations from the transport:
//! pick a device that offers a service, connect to it, check that the
//! measurement characteristic exists, and stream its notifications. These
//! traits let the same subscription logic run over btleplug
//! ([`crate::ble::BleTransport`]) and over the in-process
//! [`crate::mock::MockTransport`].

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;
use uuid::Uuid;

use crate::error::ConnectError;

/// Stream of raw notification payloads for one characteristic, in delivery
/// order. The stream ends when the link is lost.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Criteria a device must meet to be offered during selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Service the device must expose.
    pub service: Uuid,
    /// Optional case-insensitive substring the device name must contain.
    pub name_contains: Option<String>,
}

impl DeviceFilter {
    /// Filter on a service only.
    pub fn service(service: Uuid) -> Self {
        Self {
            service,
            name_contains: None,
        }
    }

    /// Additionally require the device name to contain `name`.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_contains = Some(name.into());
        self
    }

    /// Check a device name against the name criterion.
    ///
    /// Devices without a name only match when no name criterion is set.
    pub fn matches_name(&self, name: Option<&str>) -> bool {
        match (&self.name_contains, name) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(wanted), Some(name)) => name.to_lowercase().contains(&wanted.to_lowercase()),
        }
    }
}

/// Source of peripherals.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Select a device matching `filter`.
    ///
    /// Returns [`ConnectError::UserCancelled`] when selection is aborted,
    /// including when no device is offered at all.
    async fn request_device(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Box<dyn SensorPeripheral>, ConnectError>;
}

/// A selected peripheral.
///
/// Implementations must tolerate `unsubscribe` and `disconnect` being called
/// on a partially set up peripheral.
#[async_trait]
pub trait SensorPeripheral: Send + Sync + fmt::Debug {
    /// Device name, if advertised.
    fn name(&self) -> Option<String>;

    /// Platform identifier (MAC address or CoreBluetooth UUID).
    fn id(&self) -> String;

    /// Open the link and discover services.
    async fn connect(&self) -> Result<(), ConnectError>;

    /// Check that `service` exists and carries `characteristic`.
    ///
    /// Returns [`ConnectError::ServiceUnavailable`] otherwise.
    async fn resolve(&self, service: Uuid, characteristic: Uuid) -> Result<(), ConnectError>;

    /// Enable notifications on `characteristic` and stream its payloads.
    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream, ConnectError>;

    /// Disable notifications on `characteristic`.
    async fn unsubscribe(&self, characteristic: Uuid) -> Result<(), ConnectError>;

    /// Close the link.
    async fn disconnect(&self) -> Result<(), ConnectError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridepulse_types::uuids::HEART_RATE_SERVICE;

    #[test]
    fn test_filter_without_name_matches_everything() {
        let filter = DeviceFilter::service(HEART_RATE_SERVICE);
        assert!(filter.matches_name(None));
        assert!(filter.matches_name(Some("Polar H10 1234")));
    }

    #[test]
    fn test_filter_name_is_case_insensitive() {
        let filter = DeviceFilter::service(HEART_RATE_SERVICE).with_name("polar");
        assert!(filter.matches_name(Some("Polar H10 1234")));
        assert!(!filter.matches_name(Some("Wahoo TICKR")));
        assert!(!filter.matches_name(None));
    }
}
