//! # Sleep duration generator.
//!
//! [`SleepRange`] draws worker sleep targets from a configured interval.
//! The bounds are passed in explicitly; there is no process-wide state.
//!
//! - `min == max` → always `min`
//! - `max < min`  → always `min` (an inverted interval degrades, it is not an error)
//! - `max > min`  → uniform in `[min, max)` at nanosecond resolution
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use wakevisor::SleepRange;
//!
//! let fixed = SleepRange::new(Duration::from_millis(10), Duration::from_millis(10));
//! assert_eq!(fixed.next(), Duration::from_millis(10));
//!
//! let inverted = SleepRange::new(Duration::from_millis(10), Duration::from_millis(1));
//! assert_eq!(inverted.next(), Duration::from_millis(10));
//! ```

use rand::Rng;
use std::time::Duration;

/// Closed configuration interval for worker sleep targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SleepRange {
    /// Lower bound (also the fallback for degenerate intervals).
    pub min: Duration,
    /// Upper bound (exclusive when sampling).
    pub max: Duration,
}

impl SleepRange {
    /// Creates a range from explicit bounds.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Returns `true` when every sample equals `min`.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.max <= self.min
    }

    /// Smallest value [`next`](Self::next) can return.
    #[inline]
    pub fn floor(&self) -> Duration {
        self.min
    }

    /// Draws one target using the thread-local generator.
    pub fn next(&self) -> Duration {
        self.sample(&mut rand::rng())
    }

    /// Draws one target from the given generator.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.is_fixed() {
            return self.min;
        }
        let lo = nanos(self.min);
        let hi = nanos(self.max);
        if lo >= hi {
            return self.min;
        }
        Duration::from_nanos(rng.random_range(lo..hi))
    }
}

fn nanos(d: Duration) -> u64 {
    d.as_nanos().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bounds_return_min() {
        let r = SleepRange::new(Duration::from_millis(5), Duration::from_millis(5));
        for _ in 0..100 {
            assert_eq!(r.next(), Duration::from_millis(5));
        }
    }

    #[test]
    fn inverted_bounds_return_min() {
        let r = SleepRange::new(Duration::from_millis(50), Duration::from_millis(1));
        assert!(r.is_fixed());
        for _ in 0..100 {
            assert_eq!(r.next(), Duration::from_millis(50));
        }
    }

    #[test]
    fn samples_stay_in_half_open_interval() {
        let min = Duration::from_millis(1);
        let max = Duration::from_millis(3);
        let r = SleepRange::new(min, max);
        for _ in 0..1_000 {
            let d = r.next();
            assert!(d >= min, "{d:?} below {min:?}");
            assert!(d < max, "{d:?} not below {max:?}");
        }
    }

    #[test]
    fn one_nanosecond_wide_range_is_min() {
        let min = Duration::from_nanos(10);
        let r = SleepRange::new(min, Duration::from_nanos(11));
        for _ in 0..20 {
            assert_eq!(r.next(), min);
        }
    }

    #[test]
    fn zero_min_is_allowed() {
        let r = SleepRange::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(r.next(), Duration::ZERO);
        assert_eq!(r.floor(), Duration::ZERO);
    }
}
