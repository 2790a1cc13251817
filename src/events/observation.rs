//! # Sleep-drift observation record.
//!
//! One [`Observation`] is produced per completed sleep cycle of a worker: how long the
//! worker asked to sleep, how long it was actually suspended, and the resulting error
//! rate `(actual - target) / target`.

use std::fmt;
use std::time::Duration;

/// Measurement of one completed sleep cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Worker identity (the id of its task).
    pub worker: u64,
    /// 1-based index of the measured cycle.
    pub cycle: u64,
    /// Time elapsed between the suspension request and the next cycle.
    pub actual: Duration,
    /// Requested sleep duration.
    pub target: Duration,
    /// Signed fractional drift: `(actual - target) / target`.
    pub error_rate: f64,
    /// Running maximum of `error_rate` for this worker (never decreases).
    pub max_error_rate: f64,
}

impl Observation {
    /// Computes the signed error rate of `actual` against `target`.
    ///
    /// A zero target yields a non-finite value.
    pub fn error_rate(actual: Duration, target: Duration) -> f64 {
        (actual.as_secs_f64() - target.as_secs_f64()) / target.as_secs_f64()
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Thread({}) slept {:.3} ms, targeted {:.3} ms, error rate {:.2}%, max error rate {:.2}%",
            self.worker,
            millis(self.actual),
            millis(self.target),
            self.error_rate * 100.0,
            self.max_error_rate * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_rate_is_signed_fraction() {
        let target = Duration::from_millis(10);
        assert!((Observation::error_rate(Duration::from_millis(11), target) - 0.1).abs() < 1e-9);
        assert!((Observation::error_rate(Duration::from_millis(9), target) + 0.1).abs() < 1e-9);
        assert_eq!(Observation::error_rate(target, target), 0.0);
    }

    #[test]
    fn zero_target_gives_non_finite_rates() {
        let late = Observation::error_rate(Duration::from_millis(1), Duration::ZERO);
        assert!(late.is_infinite() && late > 0.0);
        assert!(Observation::error_rate(Duration::ZERO, Duration::ZERO).is_nan());
    }

    #[test]
    fn zero_target_is_not_finite() {
        assert!(!Observation::error_rate(Duration::from_millis(1), Duration::ZERO).is_finite());
    }

    #[test]
    fn display_matches_record_layout() {
        let obs = Observation {
            worker: 3,
            cycle: 1,
            actual: Duration::from_micros(10_500),
            target: Duration::from_millis(10),
            error_rate: 0.05,
            max_error_rate: 0.05,
        };
        assert_eq!(
            obs.to_string(),
            "Thread(3) slept 10.500 ms, targeted 10.000 ms, error rate 5.00%, max error rate 5.00%"
        );
    }
}
