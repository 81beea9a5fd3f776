//! Command-line renderer for live heart-rate and cycling power telemetry.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Scan for nearby heart-rate and power sensors |
//! | `watch` | Connect and print every update with its trend arrow |
//! | `config` | Manage CLI configuration |
//!
//! # Configuration
//!
//! Settings live in `~/.config/ridepulse/config.toml` (or the platform
//! equivalent, or `$RIDEPULSE_CONFIG`). Command-line flags win over the file.
//!
//! # Environment Variables
//!
//! - `RIDEPULSE_HR_DEVICE` / `RIDEPULSE_POWER_DEVICE`: sensor name filters
//! - `RIDEPULSE_CONFIG`: config file location
//! - `NO_COLOR`: disable colored output when set

mod cli;
mod commands;
mod config;
mod format;
mod style;
mod util;

use anyhow::Result;
use clap::Parser;
use ridepulse_types::MetricKind;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, OutputFormat};
use crate::commands::{WatchArgs, cmd_config, cmd_scan, cmd_watch};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    let no_color = cli.no_color || config.no_color;
    let default_format = OutputFormat::from_config(config.format.as_deref()).unwrap_or_default();

    match cli.command {
        Commands::Scan { timeout, output } => {
            cmd_scan(
                timeout,
                output.format.unwrap_or(default_format),
                cli.output.as_ref(),
                cli.quiet,
                no_color,
            )
            .await
        }
        Commands::Watch {
            metric,
            hr_device,
            power_device,
            decode,
            capacity,
            scan_secs,
            count,
            interactive,
            output,
        } => {
            let mut file = config.clone();
            if let Some(decode) = decode {
                file.decode_mode = decode.into();
            }
            if let Some(capacity) = capacity {
                file.capacity = capacity;
            }
            if let Some(secs) = scan_secs {
                file.scan_secs = secs;
            }
            let hub_config = file.hub_config();
            hub_config.validate()?;

            let args = WatchArgs {
                metrics: metric.metrics(),
                hr_device: hr_device.or_else(|| config.device_for(MetricKind::HeartRate).map(String::from)),
                power_device: power_device.or_else(|| config.device_for(MetricKind::Power).map(String::from)),
                count,
                interactive,
                format: output.format.unwrap_or(default_format),
                output: cli.output,
                no_color,
                quiet: cli.quiet,
            };
            cmd_watch(args, hub_config).await
        }
        Commands::Config { action } => cmd_config(action),
    }
}
