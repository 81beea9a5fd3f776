//! Example: Live Heart Rate and Power
//!
//! Connects to a heart-rate strap and a power meter, then prints one line per
//! accepted sample with the current value and trend arrow until Ctrl+C.
//!
//! Run with: `cargo run --example live_dashboard -- [HR_NAME] [POWER_NAME]`

use std::env;
use std::sync::Arc;

use ridepulse_core::{BleTransport, HubConfig, MetricKind, Snapshot, TelemetryHub};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let hr_name = args.get(1).cloned();
    let power_name = args.get(2).cloned();

    let config = HubConfig::default();
    let transport = BleTransport::new(config.scan_duration).await?;
    let hub = TelemetryHub::new(Arc::new(transport), config)?;
    hub.set_name_filter(MetricKind::HeartRate, hr_name);
    hub.set_name_filter(MetricKind::Power, power_name);

    for metric in MetricKind::ALL {
        hub.register_consumer(metric, |metric: MetricKind, snapshot: &Snapshot| {
            let Some(latest) = snapshot.latest() else {
                return;
            };
            let arrow = snapshot.trend.map(|t| t.symbol()).unwrap_or(" ");
            println!(
                "{:<10} {:>4}{:<3} {}",
                metric.label(),
                latest.value(),
                metric.unit(),
                arrow
            );
        });
    }

    for metric in MetricKind::ALL {
        println!("Scanning for {} sensor...", metric.label());
        match hub.start_subscription(metric).await {
            Ok(handle) => println!(
                "Connected to {}",
                handle.device_name().unwrap_or_else(|| "unknown".to_string())
            ),
            Err(e) => eprintln!("Cannot connect {} sensor: {}", metric.label(), e),
        }
    }

    println!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    hub.shutdown().await;
    Ok(())
}
