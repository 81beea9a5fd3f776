//! Trend between the two most recent samples of a metric.

use std::cmp::Ordering;

use ridepulse_types::{Sample, TrendIndicator};

/// Stateless trend derivation.
///
/// The caller supplies the previous sample; for a subscription that is the
/// latest sample in its buffer before the new one is appended.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendCalculator;

impl TrendCalculator {
    /// Compare `current` with `previous`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ridepulse_core::trend::TrendCalculator;
    /// use ridepulse_types::{Sample, TrendIndicator};
    ///
    /// let before = Sample::new(0, 15);
    /// let now = Sample::new(1, 12);
    /// assert_eq!(TrendCalculator::update(now, Some(before)), TrendIndicator::Down);
    /// assert_eq!(TrendCalculator::update(now, None), TrendIndicator::Steady);
    /// ```
    #[must_use]
    pub fn update(current: Sample, previous: Option<Sample>) -> TrendIndicator {
        let Some(previous) = previous else {
            return TrendIndicator::Steady;
        };

        match current.value().cmp(&previous.value()) {
            Ordering::Greater => TrendIndicator::Up,
            Ordering::Less => TrendIndicator::Down,
            Ordering::Equal => TrendIndicator::Steady,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_previous_is_steady() {
        assert_eq!(
            TrendCalculator::update(Sample::new(0, 180), None),
            TrendIndicator::Steady
        );
    }

    #[test]
    fn test_directions() {
        let prev = Sample::new(0, 100);
        assert_eq!(
            TrendCalculator::update(Sample::new(1, 101), Some(prev)),
            TrendIndicator::Up
        );
        assert_eq!(
            TrendCalculator::update(Sample::new(1, 99), Some(prev)),
            TrendIndicator::Down
        );
        assert_eq!(
            TrendCalculator::update(Sample::new(1, 100), Some(prev)),
            TrendIndicator::Steady
        );
    }

    #[test]
    fn test_ignores_timestamps() {
        // A later-stamped previous sample still compares by value only.
        let prev = Sample::new(10, 5);
        assert_eq!(
            TrendCalculator::update(Sample::new(1, 6), Some(prev)),
            TrendIndicator::Up
        );
    }

    proptest! {
        #[test]
        fn trend_matches_value_ordering(a in any::<i32>(), b in any::<i32>()) {
            let trend = TrendCalculator::update(Sample::new(1, b), Some(Sample::new(0, a)));
            prop_assert_eq!(trend == TrendIndicator::Up, b > a);
            prop_assert_eq!(trend == TrendIndicator::Down, b < a);
            prop_assert_eq!(trend == TrendIndicator::Steady, b == a);
        }

        #[test]
        fn missing_previous_is_always_steady(ts in any::<i64>(), v in any::<i32>()) {
            prop_assert_eq!(TrendCalculator::update(Sample::new(ts, v), None), TrendIndicator::Steady);
        }
    }
}
