//! Hardware integration tests for ridepulse-core
//!
//! These tests require a Bluetooth adapter and a sensor in range, and should
//! be run with:
//! ```
//! cargo test --package ridepulse-core --test hardware_tests -- --ignored --nocapture
//! ```
//!
//! Configure sensors via environment variables:
//! - `RIDEPULSE_HR_DEVICE`: name fragment of the heart-rate strap
//! - `RIDEPULSE_POWER_DEVICE`: name fragment of the power meter or trainer
//!
//! Example:
//! ```
//! RIDEPULSE_HR_DEVICE="Polar" cargo test --package ridepulse-core --test hardware_tests -- --ignored --nocapture
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use ridepulse_core::{
    BleTransport, ConnectionState, HubConfig, MetricKind, Snapshot, TelemetryHub, scan_sensors,
};

/// Default timeout for BLE operations
const BLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Get the sensor name filter for a metric from the environment
fn device_filter(metric: MetricKind) -> Option<String> {
    let key = match metric {
        MetricKind::HeartRate => "RIDEPULSE_HR_DEVICE",
        MetricKind::Power => "RIDEPULSE_POWER_DEVICE",
    };
    env::var(key).ok().filter(|s| !s.is_empty())
}

async fn live_samples(metric: MetricKind) {
    let config = HubConfig::builder()
        .prefill(false)
        .scan_duration(Duration::from_secs(8))
        .build();
    let transport = BleTransport::new(config.scan_duration)
        .await
        .expect("no Bluetooth adapter");
    let hub = TelemetryHub::new(Arc::new(transport), config).unwrap();
    hub.set_name_filter(metric, device_filter(metric));

    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.register_consumer(metric, move |_: MetricKind, s: &Snapshot| {
        let _ = tx.send(s.clone());
    });

    let handle = timeout(BLE_TIMEOUT, hub.start_subscription(metric))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    println!("Connected to {:?}", handle.device_name());
    assert_eq!(handle.state(), ConnectionState::Subscribed);

    for _ in 0..3 {
        let snapshot = timeout(BLE_TIMEOUT, rx.recv())
            .await
            .expect("no notification within timeout")
            .expect("consumer channel closed");
        let latest = snapshot.latest().unwrap();
        println!(
            "  {} {}{} {}",
            metric.label(),
            latest.value(),
            metric.unit(),
            snapshot.trend.map(|t| t.symbol()).unwrap_or("")
        );
    }

    hub.shutdown().await;
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_scan_for_sensors() {
    let sensors = timeout(BLE_TIMEOUT, scan_sensors(Duration::from_secs(10)))
        .await
        .expect("scan timed out")
        .expect("scan failed");

    println!("Found {} sensors", sensors.len());
    for sensor in &sensors {
        println!(
            "  {} ({}) rssi={:?} {:?}",
            sensor.display_name(),
            sensor.id,
            sensor.rssi,
            sensor.metrics
        );
        assert!(!sensor.metrics.is_empty());
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_heart_rate_notifications() {
    live_samples(MetricKind::HeartRate).await;
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_power_notifications() {
    live_samples(MetricKind::Power).await;
}
