//! Retry policies.
//!
//! This module groups the knobs that control **if/when** a failed network
//! attempt is retried and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`BackoffPolicy`] whether/when to retry (attempt budget, first / factor / max)
//! - [`JitterRange`]   uniform randomization to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! RequestExecutor / StreamClient:
//!   - policy.should_retry(&err, attempt) to decide continue/stop
//!   - policy.delay(attempt) to schedule the next attempt
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → the conservative preset (3 attempts,
//!   first=500ms, factor=2.0, max=30s, jitter [0.8, 1.2]).

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterRange;
