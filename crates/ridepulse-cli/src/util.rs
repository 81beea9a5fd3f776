//! Utility functions for CLI operations.

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use dialoguer::{Select, theme::ColorfulTheme};
use ridepulse_core::{DeviceSelector, DiscoveredSensor, uuids};
use uuid::Uuid;

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

/// Line-oriented destination for streaming output.
///
/// Unlike [`write_output`], a file is created once and every line is
/// appended, so a long `watch` session ends up with the full log.
pub enum LineSink {
    Stdout,
    File(Mutex<File>),
}

impl LineSink {
    pub fn open(output: Option<&PathBuf>) -> Result<Self> {
        match output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                Ok(Self::File(Mutex::new(file)))
            }
            None => Ok(Self::Stdout),
        }
    }

    pub fn write_line(&self, line: &str) -> io::Result<()> {
        match self {
            LineSink::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(line.as_bytes())?;
                stdout.flush()
            }
            LineSink::File(file) => {
                let mut file = file.lock().expect("output file lock poisoned");
                file.write_all(line.as_bytes())?;
                file.flush()
            }
        }
    }
}

/// Fail early when an interactive prompt cannot be shown.
pub fn require_terminal() -> Result<()> {
    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        bail!(
            "Interactive selection needs a terminal.\n\
             Use --hr-device / --power-device to filter by name instead."
        );
    }
    Ok(())
}

fn service_label(service: Uuid) -> &'static str {
    if service == uuids::HEART_RATE_SERVICE {
        "heart rate"
    } else if service == uuids::CYCLING_POWER_SERVICE {
        "power"
    } else {
        "sensor"
    }
}

/// [`DeviceSelector`] that asks the user to pick from the scanned list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptSelector;

#[async_trait]
impl DeviceSelector for PromptSelector {
    async fn select(&self, service: Uuid, candidates: Vec<DiscoveredSensor>) -> Option<usize> {
        if candidates.len() == 1 {
            let only = &candidates[0];
            eprintln!("Found 1 {} sensor: {} ({})", service_label(service), only.display_name(), only.id);
            return Some(0);
        }

        let items: Vec<String> = candidates
            .iter()
            .map(|c| match c.rssi {
                Some(rssi) => format!("{} ({}, {} dBm)", c.display_name(), c.id, rssi),
                None => format!("{} ({})", c.display_name(), c.id),
            })
            .collect();
        let prompt = format!("Select a {} sensor", service_label(service));

        let picked = tokio::task::spawn_blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&items)
                .default(0)
                .interact_opt()
        })
        .await;

        match picked {
            Ok(Ok(choice)) => choice,
            Ok(Err(e)) => {
                tracing::warn!("Device prompt failed: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Device prompt task failed: {}", e);
                None
            }
        }
    }
}
