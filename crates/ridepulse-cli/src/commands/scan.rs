//! Scan command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use ridepulse_core::scan_sensors;

use crate::cli::OutputFormat;
use crate::format::{format_scan_json, format_scan_text};
use crate::util::write_output;

pub async fn cmd_scan(
    timeout: u64,
    format: OutputFormat,
    output: Option<&PathBuf>,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    if !quiet && matches!(format, OutputFormat::Text) {
        eprintln!("Scanning for heart-rate and power sensors... ({}s)", timeout);
    }

    let sensors = scan_sensors(Duration::from_secs(timeout))
        .await
        .context("Failed to scan for sensors")?;

    let content = match format {
        OutputFormat::Json => format_scan_json(&sensors)?,
        OutputFormat::Text => format_scan_text(&sensors, no_color),
    };
    write_output(output, &content)
}
