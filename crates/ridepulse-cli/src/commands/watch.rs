//! Watch command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ridepulse_core::{BleTransport, HubConfig, Snapshot, TelemetryEvent, TelemetryHub};
use ridepulse_types::MetricKind;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::format::{format_snapshot_json, format_snapshot_text};
use crate::style;
use crate::util::{LineSink, PromptSelector, require_terminal};

/// Arguments for the watch command.
#[derive(Debug, Clone)]
pub struct WatchArgs {
    pub metrics: Vec<MetricKind>,
    pub hr_device: Option<String>,
    pub power_device: Option<String>,
    pub count: u64,
    pub interactive: bool,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub no_color: bool,
    pub quiet: bool,
}

impl WatchArgs {
    fn device_for(&self, metric: MetricKind) -> Option<String> {
        match metric {
            MetricKind::HeartRate => self.hr_device.clone(),
            MetricKind::Power => self.power_device.clone(),
        }
    }
}

pub async fn cmd_watch(args: WatchArgs, config: HubConfig) -> Result<()> {
    if args.interactive {
        require_terminal()?;
    }

    let mut transport = BleTransport::new(config.scan_duration)
        .await
        .context("Failed to open Bluetooth adapter")?;
    if args.interactive {
        transport = transport.with_selector(Arc::new(PromptSelector));
    }

    let hub = TelemetryHub::new(Arc::new(transport), config)?;
    run_watch(&hub, &args).await
}

fn render(args: &WatchArgs, metric: MetricKind, snapshot: &Snapshot) -> Option<String> {
    match args.format {
        OutputFormat::Text => format_snapshot_text(metric, snapshot, args.no_color),
        OutputFormat::Json => match format_snapshot_json(metric, snapshot) {
            Ok(line) => line,
            Err(e) => {
                debug!("Failed to serialize snapshot: {}", e);
                None
            }
        },
    }
}

/// Subscribe every requested metric on `hub` and print updates until
/// `count` lines were written, every link is gone, or Ctrl+C.
pub async fn run_watch(hub: &TelemetryHub, args: &WatchArgs) -> Result<()> {
    let sink = LineSink::open(args.output.as_ref())?;
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let mut consumers = Vec::new();
    for &metric in &args.metrics {
        let tx = tx.clone();
        let render_args = args.clone();
        consumers.push(hub.register_consumer(metric, move |metric: MetricKind, snapshot: &Snapshot| {
            if let Some(line) = render(&render_args, metric, snapshot) {
                let _ = tx.send(line);
            }
        }));
    }
    drop(tx);

    let mut events = hub.events();
    let mut active = 0usize;
    for &metric in &args.metrics {
        hub.set_name_filter(metric, args.device_for(metric));
        if !args.quiet {
            eprintln!("Connecting {} sensor...", metric);
        }
        match hub.start_subscription(metric).await {
            Ok(handle) => {
                active += 1;
                if !args.quiet {
                    let name = handle.device_name().unwrap_or_else(|| "unknown".to_string());
                    eprintln!("{} connected to {}", style::format_label(metric, args.no_color), name);
                }
            }
            Err(e) => {
                eprintln!("{} ({})", style::connect_failure(metric), e);
            }
        }
    }

    if active == 0 {
        hub.shutdown().await;
        bail!("No sensors connected");
    }

    let mut written = 0u64;
    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                if !args.quiet {
                    eprintln!("\nShutting down...");
                }
                break Ok(());
            }
            Some(line) = rx.recv() => {
                if let Err(e) = sink.write_line(&line) {
                    break Err(e).context("Failed to write output");
                }
                written += 1;
                if args.count > 0 && written >= args.count {
                    break Ok(());
                }
            }
            event = events.recv() => match event {
                Ok(TelemetryEvent::ConnectionLost { metric }) => {
                    eprintln!(
                        "{} sensor disconnected: {}",
                        style::format_label(metric, args.no_color),
                        style::format_state(&hub.state(metric).unwrap_or_default(), args.no_color)
                    );
                    active = active.saturating_sub(1);
                    if active == 0 {
                        break Err(anyhow::anyhow!("All sensors disconnected"));
                    }
                }
                Ok(event) => debug!(?event, "Lifecycle event"),
                Err(RecvError::Lagged(skipped)) => debug!("Skipped {} lifecycle events", skipped),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    for id in consumers {
        hub.unregister_consumer(id);
    }
    hub.shutdown().await;
    result
}
