//! # Logging subscriber backed by `tracing`.
//!
//! [`LogSubscriber`] renders lifecycle events as structured `tracing` records.
//! Failures and overflows log at `warn`, everything else at `debug`, so a
//! default `info` filter stays quiet while problems remain visible.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Structured logging subscriber.
#[derive(Default)]
pub struct LogSubscriber;

#[async_trait]
impl Subscribe for LogSubscriber {
    async fn on_event(&self, e: &Event) {
        let endpoint = e.endpoint.as_deref().unwrap_or("-");
        let task = e.task.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::RequestStarting => {
                debug!(endpoint, attempt = e.attempt, "request attempt starting");
            }
            EventKind::RequestSucceeded => {
                debug!(endpoint, attempt = e.attempt, status = e.status, "request succeeded");
            }
            EventKind::RequestFailed => {
                warn!(
                    endpoint,
                    attempt = e.attempt,
                    status = e.status,
                    reason = e.reason.as_deref(),
                    "request attempt failed"
                );
            }
            EventKind::RequestRetryScheduled => {
                debug!(
                    endpoint,
                    after_attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    "retry scheduled"
                );
            }
            EventKind::StreamConnecting => {
                debug!(endpoint, attempt = e.attempt, "stream connecting");
            }
            EventKind::StreamConnected => {
                debug!(endpoint, "stream connected");
            }
            EventKind::StreamReconnectScheduled => {
                warn!(
                    endpoint,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    reason = e.reason.as_deref(),
                    "stream reconnect scheduled"
                );
            }
            EventKind::StreamCompleted => {
                debug!(endpoint, "stream completed");
            }
            EventKind::StreamDisconnected => {
                debug!(endpoint, reason = e.reason.as_deref(), "stream disconnected");
            }
            EventKind::TaskSubmitted => {
                debug!(task, "task submitted");
            }
            EventKind::TaskStarting => {
                debug!(task, "task starting");
            }
            EventKind::TaskCompleted => {
                debug!(task, "task completed");
            }
            EventKind::TaskFailed => {
                warn!(task, reason = e.reason.as_deref(), "task failed");
            }
            EventKind::TaskCancelled => {
                debug!(task, "task cancelled");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(
                    subscriber = task,
                    reason = e.reason.as_deref(),
                    "subscriber issue"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
