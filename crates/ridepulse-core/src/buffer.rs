//! Fixed-capacity sliding window of recent samples.

use std::collections::VecDeque;

use ridepulse_types::Sample;

/// Default number of samples kept per metric.
pub const DEFAULT_CAPACITY: usize = 200;

/// Ordered, append-only buffer that evicts its oldest sample when full.
///
/// Order is acceptance order. The buffer never reorders, averages or drops
/// the newest sample.
///
/// The buffer itself is not synchronized; the owning subscription keeps it
/// behind a lock together with the trend so readers always see a consistent
/// pair.
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SlidingWindowBuffer {
    /// Create an empty buffer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be > 0");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a buffer filled with `capacity` zero-valued samples stamped at
    /// `timestamp`.
    ///
    /// Renderers can draw a full-width chart before the first notification
    /// arrives.
    pub fn prefilled(capacity: usize, timestamp: i64) -> Self {
        let mut buffer = Self::new(capacity);
        buffer
            .samples
            .extend(std::iter::repeat_n(Sample::placeholder(timestamp), capacity));
        buffer
    }

    /// Append a sample, evicting the oldest one if the buffer is full.
    pub fn append(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Copy of the buffer contents, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// The sample immediately before the most recent one.
    pub fn previous(&self) -> Option<Sample> {
        let len = self.samples.len();
        if len < 2 {
            return None;
        }
        self.samples.get(len - 2).copied()
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    /// Iterate over the samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SlidingWindowBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}


/// Property-based tests for the sliding window.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Length is min(capacity, initial + appended) and never exceeds capacity.
        #[test]
        fn length_is_bounded(
            capacity in 1usize..64,
            prefill in any::<bool>(),
            appended in proptest::collection::vec(any::<i32>(), 0..200),
        ) {
            let mut buffer = if prefill {
                SlidingWindowBuffer::prefilled(capacity, 0)
            } else {
                SlidingWindowBuffer::new(capacity)
            };
            let initial = buffer.len();

            for (i, value) in appended.iter().enumerate() {
                buffer.append(Sample::new(i as i64, *value));
                prop_assert!(buffer.len() <= capacity);
            }

            prop_assert_eq!(buffer.len(), capacity.min(initial + appended.len()));
            prop_assert_eq!(buffer.snapshot().len(), buffer.len());
        }

        /// After overflowing, the buffer holds exactly the last `capacity`
        /// samples in acceptance order.
        #[test]
        fn keeps_last_capacity_samples(
            capacity in 1usize..32,
            extra in 1usize..64,
        ) {
            let mut buffer = SlidingWindowBuffer::new(capacity);
            let total = capacity + extra;
            let accepted: Vec<Sample> = (0..total)
                .map(|i| Sample::new(i as i64, i as i32))
                .collect();

            for sample in &accepted {
                buffer.append(*sample);
            }

            prop_assert_eq!(buffer.snapshot(), accepted[total - capacity..].to_vec());
        }
    }
}
