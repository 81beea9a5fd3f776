//! Telemetry hub configuration.
//!
//! Use the builder pattern for convenient configuration:
//!
//! ```
//! use std::time::Duration;
//! use ridepulse_core::HubConfig;
//! use ridepulse_types::DecodeMode;
//!
//! let config = HubConfig::builder()
//!     .capacity(120)
//!     .prefill(false)
//!     .decode_mode(DecodeMode::Standard)
//!     .scan_duration(Duration::from_secs(8))
//!     .build();
//!
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use ridepulse_types::DecodeMode;

use crate::buffer::DEFAULT_CAPACITY;
use crate::error::{Error, Result};

/// Configuration shared by every subscription a hub creates.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Number of samples kept per metric.
    /// Default: 200.
    pub capacity: usize,
    /// Fill new buffers with zero-valued samples so they start at full length.
    /// Default: true.
    pub prefill: bool,
    /// Payload layout to decode.
    /// Default: [`DecodeMode::Compatible`].
    pub decode_mode: DecodeMode,
    /// How long a BLE transport scans for candidate devices.
    /// Default: 5 seconds.
    pub scan_duration: Duration,
    /// Capacity of the lifecycle event channel.
    /// Default: 100 events.
    pub event_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            prefill: true,
            decode_mode: DecodeMode::Compatible,
            scan_duration: Duration::from_secs(5),
            event_capacity: 100,
        }
    }
}

impl HubConfig {
    /// Create a new builder for HubConfig.
    pub fn builder() -> HubConfigBuilder {
        HubConfigBuilder::default()
    }

    /// Validate the configuration and return an error if invalid.
    ///
    /// Checks that:
    /// - `capacity` is > 0
    /// - `event_capacity` is > 0
    /// - `scan_duration` is > 0
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::invalid_config("capacity must be > 0"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config("event_capacity must be > 0"));
        }
        if self.scan_duration.is_zero() {
            return Err(Error::invalid_config("scan_duration must be > 0"));
        }
        Ok(())
    }
}

/// Builder for HubConfig.
#[derive(Debug, Clone, Default)]
pub struct HubConfigBuilder {
    config: HubConfig,
}

impl HubConfigBuilder {
    /// Set the per-metric buffer capacity.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set whether new buffers start pre-filled with zeros.
    #[must_use]
    pub fn prefill(mut self, prefill: bool) -> Self {
        self.config.prefill = prefill;
        self
    }

    /// Set the payload decode rule.
    #[must_use]
    pub fn decode_mode(mut self, mode: DecodeMode) -> Self {
        self.config.decode_mode = mode;
        self
    }

    /// Set the BLE scan duration used during device selection.
    #[must_use]
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.config.scan_duration = duration;
        self
    }

    /// Set the lifecycle event channel capacity.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Build the HubConfig.
    #[must_use]
    pub fn build(self) -> HubConfig {
        self.config
    }
}
