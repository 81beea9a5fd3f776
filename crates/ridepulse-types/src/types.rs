//! Core types for live sensor telemetry.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::uuid::{
    CYCLING_POWER_MEASUREMENT, CYCLING_POWER_SERVICE, HEART_RATE_MEASUREMENT, HEART_RATE_SERVICE,
};

/// Kind of metric stream a sensor provides.
///
/// The metric decides which GATT service is used to find a device, which
/// characteristic is subscribed to, how payloads are decoded, and which
/// buffer the samples land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MetricKind {
    /// Heart rate in beats per minute.
    HeartRate,
    /// Instantaneous cycling power in watts.
    Power,
}

impl MetricKind {
    /// Every metric kind, in display order.
    pub const ALL: [MetricKind; 2] = [MetricKind::HeartRate, MetricKind::Power];

    /// GATT service a device must advertise to be offered for this metric.
    #[must_use]
    pub fn service(&self) -> Uuid {
        match self {
            MetricKind::HeartRate => HEART_RATE_SERVICE,
            MetricKind::Power => CYCLING_POWER_SERVICE,
        }
    }

    /// Characteristic that streams measurements for this metric.
    #[must_use]
    pub fn characteristic(&self) -> Uuid {
        match self {
            MetricKind::HeartRate => HEART_RATE_MEASUREMENT,
            MetricKind::Power => CYCLING_POWER_MEASUREMENT,
        }
    }

    /// Display unit.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::HeartRate => "bpm",
            MetricKind::Power => "W",
        }
    }

    /// Short human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::HeartRate => "HR",
            MetricKind::Power => "Power",
        }
    }

    /// Parse a metric from a user-supplied name.
    ///
    /// # Examples
    ///
    /// ```
    /// use ridepulse_types::MetricKind;
    ///
    /// assert_eq!(MetricKind::from_name("hr"), Some(MetricKind::HeartRate));
    /// assert_eq!(MetricKind::from_name("Heart-Rate"), Some(MetricKind::HeartRate));
    /// assert_eq!(MetricKind::from_name("power"), Some(MetricKind::Power));
    /// assert_eq!(MetricKind::from_name("cadence"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "hr" | "heartrate" | "heart" => Some(MetricKind::HeartRate),
            "power" | "pwr" | "watts" => Some(MetricKind::Power),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::HeartRate => write!(f, "heart rate"),
            MetricKind::Power => write!(f, "power"),
        }
    }
}

/// A single accepted measurement.
///
/// The timestamp is stamped locally when the sample is accepted, not taken
/// from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    timestamp: i64,
    value: i32,
}

impl Sample {
    /// Create a sample from an acceptance timestamp (ms since the Unix epoch)
    /// and a decoded value.
    #[must_use]
    pub const fn new(timestamp: i64, value: i32) -> Self {
        Self { timestamp, value }
    }

    /// Zero-valued sample used to pre-fill fresh buffers.
    #[must_use]
    pub const fn placeholder(timestamp: i64) -> Self {
        Self::new(timestamp, 0)
    }

    /// Acceptance time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Decoded value in the metric's unit.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.value
    }
}

/// Direction of change between the two most recent samples of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrendIndicator {
    /// The latest value is higher than the one before it.
    Up,
    /// The latest value is lower than the one before it.
    Down,
    /// No change, or nothing to compare against.
    Steady,
}

impl TrendIndicator {
    /// Arrow glyph used by dashboards.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            TrendIndicator::Up => "⬆",
            TrendIndicator::Down => "⬇",
            TrendIndicator::Steady => "⇿",
        }
    }
}

impl fmt::Display for TrendIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Connection lifecycle of a metric subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "state", content = "reason", rename_all = "snake_case"))]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Idle,
    /// A connect attempt is in flight.
    Connecting,
    /// Notifications are flowing into the buffer.
    Subscribed,
    /// The last connect attempt failed or the link was lost.
    Failed(String),
}

impl ConnectionState {
    /// Whether the subscription currently holds (or is acquiring) a device.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Subscribed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Subscribed => write!(f, "subscribed"),
            ConnectionState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_targets() {
        assert_eq!(
            MetricKind::HeartRate.service().to_string(),
            "0000180d-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            MetricKind::HeartRate.characteristic().to_string(),
            "00002a37-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            MetricKind::Power.service().to_string(),
            "00001818-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            MetricKind::Power.characteristic().to_string(),
            "00002a63-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_metric_units_and_labels() {
        assert_eq!(MetricKind::HeartRate.unit(), "bpm");
        assert_eq!(MetricKind::Power.unit(), "W");
        assert_eq!(MetricKind::HeartRate.label(), "HR");
        assert_eq!(MetricKind::Power.to_string(), "power");
    }

    #[test]
    fn test_metric_from_name_rejects_unknown() {
        assert_eq!(MetricKind::from_name(""), None);
        assert_eq!(MetricKind::from_name("speed"), None);
        assert_eq!(MetricKind::from_name("PWR"), Some(MetricKind::Power));
    }

    #[test]
    fn test_sample_accessors() {
        let sample = Sample::new(1_700_000_000_000, 142);
        assert_eq!(sample.timestamp(), 1_700_000_000_000);
        assert_eq!(sample.value(), 142);
        assert_eq!(Sample::placeholder(5).value(), 0);
    }

    #[test]
    fn test_trend_symbols() {
        assert_eq!(TrendIndicator::Up.symbol(), "⬆");
        assert_eq!(TrendIndicator::Down.to_string(), "⬇");
        assert_eq!(TrendIndicator::Steady.symbol(), "⇿");
    }

    #[test]
    fn test_connection_state_activity() {
        assert!(!ConnectionState::Idle.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Subscribed.is_active());
        assert!(!ConnectionState::Failed("gone".into()).is_active());
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
        assert_eq!(
            ConnectionState::Failed("link lost".into()).to_string(),
            "failed: link lost"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_shapes() {
        let json = serde_json::to_string(&MetricKind::HeartRate).unwrap();
        assert_eq!(json, "\"heart_rate\"");

        let json = serde_json::to_string(&Sample::new(10, 15)).unwrap();
        assert_eq!(json, r#"{"timestamp":10,"value":15}"#);

        let json = serde_json::to_string(&ConnectionState::Failed("x".into())).unwrap();
        assert_eq!(json, r#"{"state":"failed","reason":"x"}"#);
    }
}
