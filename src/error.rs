//! Error types used across the networking and scheduling layers.
//!
//! This module defines three enums:
//!
//! - [`RequestError`] — errors produced by HTTP attempts and stream transports.
//! - [`TaskError`] — errors produced by scheduled work callables.
//! - [`SchedulerError`] — submission-side failures of the scheduler itself.
//!
//! All types provide `as_label()` for logging/metrics; [`RequestError`]
//! additionally exposes [`RequestError::is_retryable`], which is the single
//! source of truth the backoff policy consults.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by a single network attempt.
///
/// The executor and stream client resolve retryable variants locally (up to
/// the backoff policy's attempt budget) before surfacing anything; once
/// exhausted, the last concrete error is returned verbatim.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RequestError {
    /// Connection-level failure: refused, reset, DNS, unreachable host.
    #[error("transport error: {message}")]
    Transport {
        /// The underlying transport error message.
        message: String,
    },

    /// The attempt exceeded its configured timeout (treated like a transport error).
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// HTTP 429; the server may have directed a delay via `Retry-After`.
    #[error("rate limited (retry-after: {retry_after:?})")]
    RateLimited {
        /// Server-provided `Retry-After` delay, if any.
        retry_after: Option<Duration>,
    },

    /// HTTP 5xx server error.
    #[error("server error {status}")]
    Server {
        /// The HTTP status code (500..=599).
        status: u16,
        /// Response body, for caller-side diagnostics.
        body: String,
    },

    /// HTTP 4xx client error other than 429 (terminal, except 408).
    #[error("client error {status}")]
    Client {
        /// The HTTP status code (400..=499).
        status: u16,
        /// Response body, for caller-side diagnostics.
        body: String,
    },

    /// The server responded 2xx but the body did not decode (terminal).
    #[error("decoding error: {message}")]
    Decoding {
        /// The decoder's error message.
        message: String,
    },

    /// The operation's cancellation token fired (terminal, caller-initiated).
    #[error("cancelled")]
    Cancelled,
}

impl RequestError {
    /// Classifies an HTTP status + body into an error variant.
    ///
    /// - 429 → [`RequestError::RateLimited`] (carrying `Retry-After` if parsed)
    /// - 5xx → [`RequestError::Server`]
    /// - other non-2xx → [`RequestError::Client`]
    ///
    /// Callers must not pass 2xx statuses here.
    pub fn from_status(status: u16, body: String, retry_after: Option<Duration>) -> Self {
        match status {
            429 => RequestError::RateLimited { retry_after },
            500..=599 => RequestError::Server { status, body },
            _ => RequestError::Client { status, body },
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RequestError::Transport { .. } => "transport",
            RequestError::Timeout { .. } => "timeout",
            RequestError::RateLimited { .. } => "rate_limited",
            RequestError::Server { .. } => "server_error",
            RequestError::Client { .. } => "client_error",
            RequestError::Decoding { .. } => "decoding_error",
            RequestError::Cancelled => "cancelled",
        }
    }

    /// Indicates whether a subsequent attempt may succeed.
    ///
    /// Retryable: transport failures, timeouts, 429, 5xx, and 408
    /// (request timeout reported by the server). Everything else is terminal:
    /// other 4xx, malformed bodies, and cancellation.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Transport { .. }
            | RequestError::Timeout { .. }
            | RequestError::RateLimited { .. }
            | RequestError::Server { .. } => true,
            RequestError::Client { status, .. } => *status == 408,
            RequestError::Decoding { .. } | RequestError::Cancelled => false,
        }
    }
}

/// # Errors produced by scheduled work.
///
/// The scheduler never retries these; they are reported as-is to the
/// [`TaskHandle`](crate::TaskHandle) and to metrics.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The work callable failed.
    #[error("task failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The task was cancelled before or during execution.
    #[error("task cancelled")]
    Canceled,

    /// The scheduler shut down before delivering a result (terminal).
    #[error("scheduler closed")]
    SchedulerClosed,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Failed { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
            TaskError::SchedulerClosed => "scheduler_closed",
        }
    }
}

impl From<RequestError> for TaskError {
    /// Wraps a request error for work callables that run the executor.
    ///
    /// `Cancelled` maps onto [`TaskError::Canceled`] so the scheduler's
    /// bookkeeping sees one cancellation kind.
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Cancelled => TaskError::Canceled,
            other => TaskError::Failed {
                error: other.to_string(),
            },
        }
    }
}

/// # Submission-side scheduler failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The submission queue is full; try again later.
    #[error("scheduler queue is full")]
    Full,

    /// The scheduler's coordinator is gone.
    #[error("scheduler is closed")]
    Closed,
}
