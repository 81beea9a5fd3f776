//! Decoding of measurement notification payloads.
//!
//! Both measurement characteristics start with a flags field followed by the
//! value. Two rules are supported:
//!
//! | Mode | Heart rate (0x2A37) | Power (0x2A63) |
//! |------|---------------------|----------------|
//! | [`DecodeMode::Compatible`] | `i8` at offset 1 | `i8` at offset 1 |
//! | [`DecodeMode::Standard`] | `u8`/`u16` LE at offset 1 (flags bit 0) | `i16` LE at offset 2 |
//!
//! The compatible rule is the default and reproduces what the existing
//! dashboards display. The standard rule follows the GATT specifications and
//! handles heart rates above 127 bpm and power above 127 W.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::types::MetricKind;

/// Minimum payload width for the compatible rule (flags + one value byte).
pub const MIN_COMPATIBLE_BYTES: usize = 2;

/// Minimum Heart Rate Measurement width with an 8-bit value.
pub const MIN_HEART_RATE_U8_BYTES: usize = 2;

/// Minimum Heart Rate Measurement width with a 16-bit value.
pub const MIN_HEART_RATE_U16_BYTES: usize = 3;

/// Minimum Cycling Power Measurement width (16-bit flags + `i16` power).
pub const MIN_CYCLING_POWER_BYTES: usize = 4;

/// Heart Rate Measurement flag: value is a `u16` instead of a `u8`.
const HR_FLAG_VALUE_U16: u8 = 0x01;

/// Which payload layout to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DecodeMode {
    /// Signed byte at offset 1 for every metric.
    #[default]
    Compatible,
    /// Layouts from the Heart Rate and Cycling Power service specifications.
    Standard,
}

/// Decode a payload with the default [`DecodeMode::Compatible`] rule.
///
/// # Examples
///
/// ```
/// use ridepulse_types::{MetricKind, decode};
///
/// assert_eq!(decode::decode(MetricKind::HeartRate, &[0x00, 72]).unwrap(), 72);
/// assert!(decode::decode(MetricKind::Power, &[0x00]).is_err());
/// ```
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] if the payload is shorter than
/// [`MIN_COMPATIBLE_BYTES`].
pub fn decode(metric: MetricKind, payload: &[u8]) -> DecodeResult<i32> {
    decode_with(DecodeMode::Compatible, metric, payload)
}

/// Decode a payload with an explicit rule.
///
/// Trailing bytes (energy expended, RR intervals, pedal balance, ...) are
/// ignored.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] if the payload is shorter than the
/// minimum width for `mode` and `metric`.
pub fn decode_with(mode: DecodeMode, metric: MetricKind, payload: &[u8]) -> DecodeResult<i32> {
    use bytes::Buf;

    match mode {
        DecodeMode::Compatible => {
            require(metric, payload, MIN_COMPATIBLE_BYTES)?;
            let mut buf = &payload[1..];
            Ok(i32::from(buf.get_i8()))
        }
        DecodeMode::Standard => match metric {
            MetricKind::HeartRate => {
                require(metric, payload, MIN_HEART_RATE_U8_BYTES)?;
                let mut buf = payload;
                let flags = buf.get_u8();
                if flags & HR_FLAG_VALUE_U16 != 0 {
                    require(metric, payload, MIN_HEART_RATE_U16_BYTES)?;
                    Ok(i32::from(buf.get_u16_le()))
                } else {
                    Ok(i32::from(buf.get_u8()))
                }
            }
            MetricKind::Power => {
                require(metric, payload, MIN_CYCLING_POWER_BYTES)?;
                let mut buf = payload;
                let _flags = buf.get_u16_le();
                Ok(i32::from(buf.get_i16_le()))
            }
        },
    }
}

/// Minimum payload width that `mode` can ever accept for `metric`.
#[must_use]
pub fn min_width(mode: DecodeMode, metric: MetricKind) -> usize {
    match (mode, metric) {
        (DecodeMode::Compatible, _) => MIN_COMPATIBLE_BYTES,
        (DecodeMode::Standard, MetricKind::HeartRate) => MIN_HEART_RATE_U8_BYTES,
        (DecodeMode::Standard, MetricKind::Power) => MIN_CYCLING_POWER_BYTES,
    }
}

fn require(metric: MetricKind, payload: &[u8], expected: usize) -> DecodeResult<()> {
    if payload.len() < expected {
        return Err(DecodeError::Malformed {
            metric,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatible_reads_signed_byte_at_offset_one() {
        assert_eq!(decode(MetricKind::HeartRate, &[0x16, 64]).unwrap(), 64);
        assert_eq!(decode(MetricKind::Power, &[0x00, 0x7F, 0xAA]).unwrap(), 127);
        // Values above 127 wrap, exactly like a signed byte read.
        assert_eq!(decode(MetricKind::HeartRate, &[0x00, 0x96]).unwrap(), -106);
    }

    #[test]
    fn test_compatible_rejects_short_payloads() {
        let err = decode(MetricKind::HeartRate, &[]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed {
                metric: MetricKind::HeartRate,
                expected: 2,
                actual: 0,
            }
        );

        let err = decode(MetricKind::Power, &[0x00]).unwrap_err();
        assert!(err.to_string().contains("expected at least 2 bytes, got 1"));
    }

    #[test]
    fn test_standard_heart_rate_u8() {
        let value = decode_with(DecodeMode::Standard, MetricKind::HeartRate, &[0x00, 150]).unwrap();
        assert_eq!(value, 150);
    }

    #[test]
    fn test_standard_heart_rate_u16() {
        // flags bit 0 set, 0x0104 = 260
        let payload = [0x01, 0x04, 0x01];
        let value = decode_with(DecodeMode::Standard, MetricKind::HeartRate, &payload).unwrap();
        assert_eq!(value, 260);
    }

    #[test]
    fn test_standard_heart_rate_u16_truncated() {
        let err = decode_with(DecodeMode::Standard, MetricKind::HeartRate, &[0x01, 0x04])
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_standard_power() {
        // flags 0x0000, power 0x00FA = 250 W, trailing crank data ignored
        let payload = [0x00, 0x00, 0xFA, 0x00, 0x12, 0x34];
        let value = decode_with(DecodeMode::Standard, MetricKind::Power, &payload).unwrap();
        assert_eq!(value, 250);

        // Cycling Power allows negative instantaneous power.
        let payload = [0x00, 0x00, 0xF6, 0xFF];
        let value = decode_with(DecodeMode::Standard, MetricKind::Power, &payload).unwrap();
        assert_eq!(value, -10);
    }

    #[test]
    fn test_standard_power_truncated() {
        let err = decode_with(DecodeMode::Standard, MetricKind::Power, &[0x00, 0x00, 0xFA])
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { expected: 4, actual: 3, .. }));
    }

    #[test]
    fn test_min_width() {
        assert_eq!(min_width(DecodeMode::Compatible, MetricKind::Power), 2);
        assert_eq!(min_width(DecodeMode::Standard, MetricKind::Power), 4);
        assert_eq!(min_width(DecodeMode::Standard, MetricKind::HeartRate), 2);
    }
}
