//! Error types for payload decoding in ridepulse-types.

use thiserror::Error;

use crate::types::MetricKind;

/// Errors that can occur when decoding a notification payload.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in ridepulse-core).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload is shorter than the decode rule requires.
    #[error("Malformed {metric} payload: expected at least {expected} bytes, got {actual}")]
    Malformed {
        /// Metric the payload was decoded for.
        metric: MetricKind,
        /// Minimum payload width for the rule in use.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },
}

/// Result type alias using ridepulse-types' DecodeError type.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
