//! btleplug transport.
//!
//! Device selection works like a browser's Bluetooth chooser: scan for a
//! while with a service filter, then let a [`DeviceSelector`] pick one of the
//! candidates. The default selector takes the strongest signal.
//!
//! # Platform Differences
//!
//! - **macOS**: peripherals are identified by a CoreBluetooth UUID that is
//!   stable per Mac but differs between machines.
//! - **Linux/Windows**: peripherals are identified by their MAC address.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

use ridepulse_types::MetricKind;

use crate::error::ConnectError;
use crate::transport::{DeviceFilter, NotificationStream, SensorPeripheral, Transport};

/// A sensor seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSensor {
    /// Connection identifier (peripheral ID on macOS, address elsewhere).
    pub id: String,
    /// Advertised name.
    pub name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
    /// Metrics whose service the sensor advertises.
    pub metrics: Vec<MetricKind>,
}

impl DiscoveredSensor {
    /// Name if advertised, otherwise the identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Chooses one of the scanned candidates.
///
/// Returning `None` aborts selection with [`ConnectError::UserCancelled`].
#[async_trait]
pub trait DeviceSelector: Send + Sync {
    async fn select(&self, service: Uuid, candidates: Vec<DiscoveredSensor>) -> Option<usize>;
}

/// Picks the candidate with the strongest signal; the first one found wins
/// ties and candidates without an RSSI rank last.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrongestSignal;

impl StrongestSignal {
    fn pick(candidates: &[DiscoveredSensor]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| Reverse(c.rssi.unwrap_or(i16::MIN)))
            .map(|(i, _)| i)
    }
}

#[async_trait]
impl DeviceSelector for StrongestSignal {
    async fn select(&self, _service: Uuid, candidates: Vec<DiscoveredSensor>) -> Option<usize> {
        Self::pick(&candidates)
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter, ConnectError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or_else(|| ConnectError::transport("no Bluetooth adapter found"))
}

fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// On macOS, where addresses read as all zeros, use the peripheral ID.
fn create_identifier(address: &str, id: &PeripheralId) -> String {
    if address == "00:00:00:00:00:00" {
        format_peripheral_id(id)
    } else {
        address.to_string()
    }
}

/// Scan for `duration` and return every peripheral advertising one of
/// `services`, paired with its btleplug handle.
async fn scan_peripherals(
    adapter: &Adapter,
    services: &[Uuid],
    duration: Duration,
) -> Result<Vec<(DiscoveredSensor, Peripheral)>, ConnectError> {
    info!("Starting BLE scan for {} seconds...", duration.as_secs());

    adapter
        .start_scan(ScanFilter {
            services: services.to_vec(),
        })
        .await?;
    sleep(duration).await;
    adapter.stop_scan().await?;

    let mut found = Vec::new();
    for peripheral in adapter.peripherals().await? {
        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
                continue;
            }
        };

        let metrics: Vec<MetricKind> = MetricKind::ALL
            .into_iter()
            .filter(|m| services.contains(&m.service()) && properties.services.contains(&m.service()))
            .collect();
        if metrics.is_empty() {
            continue;
        }

        let sensor = DiscoveredSensor {
            id: create_identifier(&properties.address.to_string(), &peripheral.id()),
            name: properties.local_name.clone(),
            rssi: properties.rssi,
            metrics,
        };
        debug!(name = ?sensor.name, rssi = ?sensor.rssi, "Found sensor");
        found.push((sensor, peripheral));
    }

    info!("Scan complete. Found {} sensor(s)", found.len());
    Ok(found)
}

/// Scan for heart-rate and power sensors in range.
///
/// An empty list means nothing was found, not an error.
pub async fn scan_sensors(duration: Duration) -> Result<Vec<DiscoveredSensor>, ConnectError> {
    let adapter = get_adapter().await?;
    let services: Vec<Uuid> = MetricKind::ALL.iter().map(|m| m.service()).collect();
    let found = scan_peripherals(&adapter, &services, duration).await?;
    Ok(found.into_iter().map(|(sensor, _)| sensor).collect())
}

/// [`Transport`] over the platform Bluetooth stack.
#[derive(Clone)]
pub struct BleTransport {
    adapter: Adapter,
    scan_duration: Duration,
    selector: Arc<dyn DeviceSelector>,
}

impl std::fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("scan_duration", &self.scan_duration)
            .finish_non_exhaustive()
    }
}

impl BleTransport {
    /// Transport on the first available adapter.
    pub async fn new(scan_duration: Duration) -> Result<Self, ConnectError> {
        Ok(Self::with_adapter(get_adapter().await?, scan_duration))
    }

    pub fn with_adapter(adapter: Adapter, scan_duration: Duration) -> Self {
        Self {
            adapter,
            scan_duration,
            selector: Arc::new(StrongestSignal),
        }
    }

    /// Replace the default strongest-signal selector.
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn DeviceSelector>) -> Self {
        self.selector = selector;
        self
    }
}

#[async_trait]
impl Transport for BleTransport {
    #[tracing::instrument(level = "info", skip_all, fields(service = %filter.service))]
    async fn request_device(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Box<dyn SensorPeripheral>, ConnectError> {
        let found = scan_peripherals(&self.adapter, &[filter.service], self.scan_duration).await?;
        let (candidates, mut peripherals): (Vec<_>, Vec<_>) = found
            .into_iter()
            .filter(|(sensor, _)| filter.matches_name(sensor.name.as_deref()))
            .unzip();

        if candidates.is_empty() {
            info!("No matching sensor found");
            return Err(ConnectError::UserCancelled);
        }

        let Some(index) = self.selector.select(filter.service, candidates.clone()).await else {
            return Err(ConnectError::UserCancelled);
        };
        if index >= peripherals.len() {
            return Err(ConnectError::UserCancelled);
        }

        let sensor = &candidates[index];
        info!(device = %sensor.display_name(), rssi = ?sensor.rssi, "Selected sensor");
        Ok(Box::new(BlePeripheral {
            peripheral: peripherals.swap_remove(index),
            id: sensor.id.clone(),
            name: sensor.name.clone(),
        }))
    }
}

/// A btleplug peripheral.
#[derive(Debug, Clone)]
pub struct BlePeripheral {
    peripheral: Peripheral,
    id: String,
    name: Option<String>,
}

impl BlePeripheral {
    fn find_characteristic(&self, uuid: Uuid) -> Option<Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
    }
}

#[async_trait]
impl SensorPeripheral for BlePeripheral {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    async fn connect(&self) -> Result<(), ConnectError> {
        info!("Connecting to device...");
        self.peripheral.connect().await?;
        info!("Connected!");

        self.peripheral.discover_services().await?;
        for service in self.peripheral.services() {
            debug!("  Service: {}", service.uuid);
            for char in &service.characteristics {
                debug!("    Characteristic: {}", char.uuid);
            }
        }
        Ok(())
    }

    async fn resolve(&self, service: Uuid, characteristic: Uuid) -> Result<(), ConnectError> {
        let found = self
            .peripheral
            .services()
            .iter()
            .filter(|s| s.uuid == service)
            .any(|s| s.characteristics.iter().any(|c| c.uuid == characteristic));

        if found {
            Ok(())
        } else {
            Err(ConnectError::service_unavailable(service, characteristic))
        }
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream, ConnectError> {
        let char = self
            .find_characteristic(characteristic)
            .ok_or_else(|| ConnectError::transport(format!("characteristic {characteristic} not found")))?;

        self.peripheral.subscribe(&char).await?;
        let stream = self.peripheral.notifications().await?;

        Ok(Box::pin(stream.filter_map(move |notification| {
            futures::future::ready((notification.uuid == characteristic).then_some(notification.value))
        })))
    }

    async fn unsubscribe(&self, characteristic: Uuid) -> Result<(), ConnectError> {
        if let Some(char) = self.find_characteristic(characteristic) {
            self.peripheral.unsubscribe(&char).await?;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectError> {
        if self.peripheral.is_connected().await? {
            self.peripheral.disconnect().await?;
        }
        Ok(())
    }
}
