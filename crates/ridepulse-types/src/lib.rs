//! Platform-agnostic types for heart-rate and cycling power sensors.
//!
//! This crate provides the shared data model used by the telemetry core
//! (ridepulse-core) and by any renderer that consumes its snapshots.
//!
//! # Features
//!
//! - Sample, metric and trend types
//! - Connection state of a metric subscription
//! - GATT UUID constants for the Heart Rate and Cycling Power services
//! - Pure decoding of measurement notification payloads
//!
//! # Example
//!
//! ```
//! use ridepulse_types::{MetricKind, Sample, decode};
//!
//! let value = decode::decode(MetricKind::HeartRate, &[0x00, 128 - 1]).unwrap();
//! let sample = Sample::new(1_700_000_000_000, value);
//! assert_eq!(sample.value(), 127);
//! ```

pub mod decode;
pub mod error;
pub mod types;
pub mod uuid;

pub use decode::DecodeMode;
pub use error::{DecodeError, DecodeResult};
pub use types::{ConnectionState, MetricKind, Sample, TrendIndicator};
pub use crate::uuid as uuids;
