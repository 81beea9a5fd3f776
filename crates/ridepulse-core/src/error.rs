//! Error types for ridepulse-core.
//!
//! Two kinds of failure exist in the telemetry core and they are handled very
//! differently:
//!
//! | Error | Where it goes | Recovery |
//! |-------|---------------|----------|
//! | [`ConnectError`] | Returned from `connect()` / `start_subscription()` | Caller decides; no automatic retry |
//! | [`DecodeError`] | Counted and logged inside the subscription | Sample dropped, stream continues |
//!
//! A failed connect never leaves a half-open subscription behind: the
//! peripheral is disconnected and the subscription state becomes
//! [`ConnectionState::Failed`](ridepulse_types::ConnectionState::Failed).
//!
//! ## Classification
//!
//! - [`ConnectError::UserCancelled`]: device selection was aborted, no device
//!   was offered, or the attempt was cancelled by a `stop` or a replacing
//!   `start_subscription`.
//! - [`ConnectError::ServiceUnavailable`]: the device does not expose the
//!   metric's service or measurement characteristic.
//! - [`ConnectError::TransportError`]: anything lower level (adapter missing,
//!   link failure, GATT errors).

use thiserror::Error;
use uuid::Uuid;

pub use ridepulse_types::DecodeError;

/// Reasons a metric subscription could not be established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Device selection was aborted or the attempt was cancelled.
    #[error("Device selection cancelled")]
    UserCancelled,

    /// The expected GATT service or characteristic is not present.
    #[error("Service {service} / characteristic {characteristic} not available on device")]
    ServiceUnavailable {
        /// Service that was looked up.
        service: Uuid,
        /// Characteristic that was looked up.
        characteristic: Uuid,
    },

    /// Lower-level connection failure.
    #[error("Transport error: {0}")]
    TransportError(String),
}

impl ConnectError {
    /// Create a transport error from any displayable cause.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::TransportError(cause.to_string())
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(service: Uuid, characteristic: Uuid) -> Self {
        Self::ServiceUnavailable {
            service,
            characteristic,
        }
    }
}

impl From<btleplug::Error> for ConnectError {
    fn from(err: btleplug::Error) -> Self {
        ConnectError::TransportError(err.to_string())
    }
}

/// Errors that can occur in the telemetry core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Establishing a subscription failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation requires an active subscription for the metric.
    #[error("No subscription for {0}")]
    NotSubscribed(ridepulse_types::MetricKind),
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using ridepulse-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
