//! # Jitter range for retry delays.
//!
//! [`JitterRange`] multiplies a computed backoff delay by a value drawn
//! uniformly from `[lo, hi]`. Randomizing delays prevents thundering-herd
//! effects when many clients retry against the same server simultaneously.
//!
//! A range of `[1.0, 1.0]` disables jitter entirely, which keeps delays
//! predictable for tests.

use rand::Rng;
use std::time::Duration;

/// Uniform multiplicative jitter applied to backoff delays.
///
/// The multiplier is drawn fresh from `[lo, hi]` for every delay, so jitter
/// output never feeds back into subsequent delay calculations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JitterRange {
    /// Lower multiplier bound (clamped to be non-negative).
    pub lo: f64,
    /// Upper multiplier bound (must be >= `lo`; swapped if not).
    pub hi: f64,
}

impl Default for JitterRange {
    /// Returns the conventional `[0.8, 1.2]` range.
    fn default() -> Self {
        Self { lo: 0.8, hi: 1.2 }
    }
}

impl JitterRange {
    /// Creates a range, normalizing inverted or negative bounds.
    pub fn new(lo: f64, hi: f64) -> Self {
        let lo = lo.max(0.0);
        let hi = hi.max(0.0);
        if lo <= hi {
            Self { lo, hi }
        } else {
            Self { lo: hi, hi: lo }
        }
    }

    /// Returns the identity range `[1.0, 1.0]` (no randomization).
    pub fn none() -> Self {
        Self { lo: 1.0, hi: 1.0 }
    }

    /// Applies a uniformly drawn multiplier from `[lo, hi]` to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        if delay.is_zero() {
            return Duration::ZERO;
        }
        if (self.hi - self.lo).abs() < f64::EPSILON {
            return delay.mul_f64(self.lo);
        }
        let factor = rand::rng().random_range(self.lo..=self.hi);
        delay.mul_f64(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_range_is_exact() {
        let j = JitterRange::none();
        assert_eq!(
            j.apply(Duration::from_millis(500)),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_apply_stays_within_bounds() {
        let j = JitterRange::new(0.8, 1.2);
        let base = Duration::from_millis(1000);
        for _ in 0..200 {
            let d = j.apply(base);
            assert!(d >= Duration::from_millis(800), "below lower bound: {d:?}");
            assert!(d <= Duration::from_millis(1200), "above upper bound: {d:?}");
        }
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let j = JitterRange::new(1.2, 0.8);
        assert_eq!(j.lo, 0.8);
        assert_eq!(j.hi, 1.2);
    }

    #[test]
    fn test_negative_bounds_clamped() {
        let j = JitterRange::new(-0.5, 1.0);
        assert_eq!(j.lo, 0.0);
    }

    #[test]
    fn test_zero_delay_stays_zero() {
        let j = JitterRange::default();
        assert_eq!(j.apply(Duration::ZERO), Duration::ZERO);
    }
}
