//! Bluetooth UUIDs for heart-rate and cycling power sensors.
//!
//! All identifiers are 16-bit SIG-assigned numbers expanded onto the
//! Bluetooth base UUID.

use uuid::{Uuid, uuid};

// --- Standard BLE Service UUIDs ---

/// Heart Rate service (0x180D).
pub const HEART_RATE_SERVICE: Uuid = uuid!("0000180d-0000-1000-8000-00805f9b34fb");

/// Cycling Power service (0x1818).
pub const CYCLING_POWER_SERVICE: Uuid = uuid!("00001818-0000-1000-8000-00805f9b34fb");

// --- Measurement Characteristic UUIDs ---

/// Heart Rate Measurement characteristic (0x2A37). Notify only.
pub const HEART_RATE_MEASUREMENT: Uuid = uuid!("00002a37-0000-1000-8000-00805f9b34fb");

/// Cycling Power Measurement characteristic (0x2A63). Notify only.
pub const CYCLING_POWER_MEASUREMENT: Uuid = uuid!("00002a63-0000-1000-8000-00805f9b34fb");

/// Expand a 16-bit SIG-assigned number onto the Bluetooth base UUID.
///
/// # Examples
///
/// ```
/// use ridepulse_types::uuid::{HEART_RATE_SERVICE, from_short};
///
/// assert_eq!(from_short(0x180D), HEART_RATE_SERVICE);
/// ```
#[must_use]
pub const fn from_short(short: u16) -> Uuid {
    Uuid::from_fields(
        short as u32,
        0x0000,
        0x1000,
        &[0x80, 0x00, 0x00, 0x80, 0x5f, 0x9b, 0x34, 0xfb],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_forms_match_constants() {
        assert_eq!(from_short(0x180D), HEART_RATE_SERVICE);
        assert_eq!(from_short(0x1818), CYCLING_POWER_SERVICE);
        assert_eq!(from_short(0x2A37), HEART_RATE_MEASUREMENT);
        assert_eq!(from_short(0x2A63), CYCLING_POWER_MEASUREMENT);
    }

    #[test]
    fn test_services_are_distinct() {
        assert_ne!(HEART_RATE_SERVICE, CYCLING_POWER_SERVICE);
        assert_ne!(HEART_RATE_MEASUREMENT, CYCLING_POWER_MEASUREMENT);
    }
}
