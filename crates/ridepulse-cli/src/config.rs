//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use ridepulse_core::HubConfig;
use ridepulse_types::{DecodeMode, MetricKind};
use serde::{Deserialize, Serialize};

use crate::cli::ConfigKey;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "RIDEPULSE_CONFIG";

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Heart-rate sensor name filter
    #[serde(default)]
    pub hr_device: Option<String>,

    /// Power sensor name filter
    #[serde(default)]
    pub power_device: Option<String>,

    /// Payload decode rule
    #[serde(default)]
    pub decode_mode: DecodeMode,

    /// Samples kept per metric
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Start buffers pre-filled with zero-valued samples
    #[serde(default = "default_true")]
    pub prefill: bool,

    /// Scan duration in seconds when choosing a sensor
    #[serde(default = "default_scan_secs")]
    pub scan_secs: u64,

    /// Default output format
    #[serde(default)]
    pub format: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,
}

fn default_capacity() -> usize {
    ridepulse_core::DEFAULT_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_scan_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hr_device: None,
            power_device: None,
            decode_mode: DecodeMode::default(),
            capacity: default_capacity(),
            prefill: true,
            scan_secs: default_scan_secs(),
            format: None,
            no_color: false,
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ridepulse")
            .join("config.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Read a config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Name filter configured for a metric.
    pub fn device_for(&self, metric: MetricKind) -> Option<&str> {
        match metric {
            MetricKind::HeartRate => self.hr_device.as_deref(),
            MetricKind::Power => self.power_device.as_deref(),
        }
    }

    /// Hub settings derived from this file.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig::builder()
            .capacity(self.capacity)
            .prefill(self.prefill)
            .decode_mode(self.decode_mode)
            .scan_duration(Duration::from_secs(self.scan_secs))
            .build()
    }

    /// Current value of a key, or `None` when unset.
    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::HrDevice => self.hr_device.clone(),
            ConfigKey::PowerDevice => self.power_device.clone(),
            ConfigKey::DecodeMode => Some(decode_mode_name(self.decode_mode).to_string()),
            ConfigKey::Capacity => Some(self.capacity.to_string()),
            ConfigKey::Prefill => Some(self.prefill.to_string()),
            ConfigKey::ScanSecs => Some(self.scan_secs.to_string()),
            ConfigKey::Format => self.format.clone(),
            ConfigKey::NoColor => Some(self.no_color.to_string()),
        }
    }

    /// Parse and store a value for a key.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        match key {
            ConfigKey::HrDevice => self.hr_device = Some(value.to_string()),
            ConfigKey::PowerDevice => self.power_device = Some(value.to_string()),
            ConfigKey::DecodeMode => {
                self.decode_mode = match value.to_ascii_lowercase().as_str() {
                    "compatible" => DecodeMode::Compatible,
                    "standard" => DecodeMode::Standard,
                    _ => bail!("Invalid decode mode '{}'. Use: compatible, standard", value),
                };
            }
            ConfigKey::Capacity => {
                let capacity: usize = value
                    .parse()
                    .with_context(|| format!("Invalid capacity '{}'", value))?;
                if capacity == 0 {
                    bail!("Capacity must be greater than 0");
                }
                self.capacity = capacity;
            }
            ConfigKey::Prefill => self.prefill = parse_bool(value)?,
            ConfigKey::ScanSecs => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid scan duration '{}'", value))?;
                if secs == 0 {
                    bail!("Scan duration must be at least 1 second");
                }
                self.scan_secs = secs;
            }
            ConfigKey::Format => {
                let format = value.to_ascii_lowercase();
                if !matches!(format.as_str(), "text" | "json") {
                    bail!("Invalid format '{}'. Use: text, json", value);
                }
                self.format = Some(format);
            }
            ConfigKey::NoColor => self.no_color = parse_bool(value)?,
        }
        Ok(())
    }

    /// Reset a key to its default.
    pub fn unset(&mut self, key: ConfigKey) {
        let defaults = Self::default();
        match key {
            ConfigKey::HrDevice => self.hr_device = None,
            ConfigKey::PowerDevice => self.power_device = None,
            ConfigKey::DecodeMode => self.decode_mode = defaults.decode_mode,
            ConfigKey::Capacity => self.capacity = defaults.capacity,
            ConfigKey::Prefill => self.prefill = defaults.prefill,
            ConfigKey::ScanSecs => self.scan_secs = defaults.scan_secs,
            ConfigKey::Format => self.format = None,
            ConfigKey::NoColor => self.no_color = defaults.no_color,
        }
    }
}

fn decode_mode_name(mode: DecodeMode) -> &'static str {
    match mode {
        DecodeMode::Compatible => "compatible",
        DecodeMode::Standard => "standard",
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("Invalid boolean '{}'. Use: true, false", value),
    }
}
