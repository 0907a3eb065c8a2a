//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings shared by the executor, stream
//! client, and scheduler.
//!
//! ## Sentinel values
//! - `max_concurrent_tasks = 0` → unlimited (no concurrency ceiling)
//! - `request_timeout = 0s` → no per-attempt timeout
//!
//! Prefer the helper accessors over sprinkling sentinel checks across the
//! codebase.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Global configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of scheduled tasks running simultaneously.
    ///
    /// - `0` = unlimited
    /// - `n > 0` = at most `n` tasks run at once
    pub max_concurrent_tasks: usize,

    /// Capacity of the scheduler's submission queue.
    pub submit_queue_capacity: usize,

    /// Capacity of the event bus broadcast ring buffer (min 1; clamped).
    pub bus_capacity: usize,

    /// Default per-attempt request timeout (`0s` = no timeout).
    pub request_timeout: Duration,

    /// Default backoff policy for requests and stream reconnects.
    pub backoff: BackoffPolicy,
}

impl Config {
    /// Returns the concurrency ceiling as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` concurrent tasks
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent_tasks == 0 {
            None
        } else {
            Some(self.max_concurrent_tasks)
        }
    }

    /// Returns the default per-attempt timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.request_timeout == Duration::ZERO {
            None
        } else {
            Some(self.request_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_concurrent_tasks = 4`
    /// - `submit_queue_capacity = 256`
    /// - `bus_capacity = 1024`
    /// - `request_timeout = 30s`
    /// - `backoff = BackoffPolicy::conservative()`
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 4,
            submit_queue_capacity: 256,
            bus_capacity: 1024,
            request_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
        }
    }
}
