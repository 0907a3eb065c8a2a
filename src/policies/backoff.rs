//! # Backoff policy for retrying network attempts.
//!
//! [`BackoffPolicy`] decides **whether** a failed attempt may be retried and
//! **how long** to wait before the next one:
//! - [`BackoffPolicy::max_attempts`] — the total attempt budget;
//! - [`BackoffPolicy::first`] — the delay after the first failure;
//! - [`BackoffPolicy::factor`] — the multiplicative growth factor;
//! - [`BackoffPolicy::max`] — the delay cap;
//! - [`BackoffPolicy::jitter`] — uniform multiplier range.
//!
//! The delay for attempt `n` (1-based) is `first × factor^(n-1)`, clamped to
//! `max`, then multiplied by a value drawn from the jitter range. The base is
//! derived purely from the attempt number, so jitter output never feeds back
//! into subsequent calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use netvisor::{BackoffPolicy, JitterRange};
//!
//! let backoff = BackoffPolicy {
//!     max_attempts: 3,
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterRange::none(),
//! };
//!
//! // Attempt 1 — uses 'first' (100ms)
//! assert_eq!(backoff.delay(1), Duration::from_millis(100));
//!
//! // Attempt 2 — first × factor = 200ms
//! assert_eq!(backoff.delay(2), Duration::from_millis(200));
//!
//! // Attempt 10 — 100ms × 2^9 = 51_200ms → capped at max=10s
//! assert_eq!(backoff.delay(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::error::RequestError;
use crate::policies::jitter::JitterRange;

/// Retry backoff policy.
///
/// Immutable value, cheap to copy, safely shared across all callers. The two
/// standard presets ([`conservative`](Self::conservative) and
/// [`aggressive`](Self::aggressive)) differ only in configuration, never in
/// code path.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Total attempt budget (`>= 1`; 0 is clamped to 1 by `should_retry`).
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub first: Duration,
    /// Maximum delay cap for retries.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Uniform jitter range applied to every delay.
    pub jitter: JitterRange,
}

impl Default for BackoffPolicy {
    /// Returns the [`conservative`](Self::conservative) preset.
    fn default() -> Self {
        Self::conservative()
    }
}

impl BackoffPolicy {
    /// Conservative preset: 3 attempts, 0.5s initial delay, 2.0× growth,
    /// jitter [0.8, 1.2], capped at 30s.
    pub fn conservative() -> Self {
        Self {
            max_attempts: 3,
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterRange::new(0.8, 1.2),
        }
    }

    /// Aggressive preset: 5 attempts, 0.25s initial delay, 1.5× growth,
    /// tighter jitter [0.9, 1.1], capped at 30s.
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 5,
            first: Duration::from_millis(250),
            max: Duration::from_secs(30),
            factor: 1.5,
            jitter: JitterRange::new(0.9, 1.1),
        }
    }

    /// Decides whether `error` may be retried after `attempt` attempts.
    ///
    /// Returns false once `attempt >= max_attempts` regardless of error kind;
    /// otherwise delegates to [`RequestError::is_retryable`].
    pub fn should_retry(&self, error: &RequestError, attempt: u32) -> bool {
        if attempt >= self.max_attempts.max(1) {
            return false;
        }
        error.is_retryable()
    }

    /// Computes the jittered delay before the attempt after `attempt` (1-based).
    ///
    /// Returns [`Duration::ZERO`] for `attempt == 0`. The base delay is
    /// `first × factor^(attempt-1)`, clamped to [`BackoffPolicy::max`] before
    /// jitter is applied; non-finite or negative intermediates clamp to `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let max_secs = self.max.as_secs_f64();
        let exp = (attempt - 1).min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base)
    }
}
