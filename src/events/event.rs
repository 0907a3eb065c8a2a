//! # Lifecycle events emitted by the executor, stream client, and scheduler.
//!
//! The [`EventKind`] enum classifies events across three sources:
//! - **Request events**: attempt flow of the HTTP executor
//! - **Stream events**: connection lifecycle of the stream client
//! - **Task events**: scheduling flow of the task scheduler
//!
//! The [`Event`] struct carries optional metadata such as the logical
//! endpoint, task id, attempt number, and backoff delay.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    SubscriberPanicked,
    /// Subscriber dropped an event (queue full or worker closed).
    SubscriberOverflow,

    // === Request events ===
    /// An HTTP attempt is starting.
    ///
    /// Sets: `endpoint`, `attempt`.
    RequestStarting,
    /// An HTTP attempt returned 2xx.
    ///
    /// Sets: `endpoint`, `attempt`, `status`.
    RequestSucceeded,
    /// An HTTP attempt failed (transport error or non-2xx status).
    ///
    /// Sets: `endpoint`, `attempt`, `reason`, `status` (if any).
    RequestFailed,
    /// A retry was scheduled after a failed attempt.
    ///
    /// Sets: `endpoint`, `attempt` (the failed one), `delay_ms`.
    RequestRetryScheduled,

    // === Stream events ===
    /// The stream client is opening a transport.
    ///
    /// Sets: `endpoint`, `attempt` (reconnect counter, 0 on first connect).
    StreamConnecting,
    /// The transport is established (2xx headers received).
    ///
    /// Sets: `endpoint`.
    StreamConnected,
    /// A reconnect was scheduled after a transport failure.
    ///
    /// Sets: `endpoint`, `attempt`, `delay_ms`, `reason`.
    StreamReconnectScheduled,
    /// The logical stream completed via the done sentinel.
    ///
    /// Sets: `endpoint`.
    StreamCompleted,
    /// The subscription reached Disconnected (stop, graceful end, or retries
    /// exhausted).
    ///
    /// Sets: `endpoint`, `reason` (for non-graceful endings).
    StreamDisconnected,

    // === Task events ===
    /// A task entered the scheduler's queues.
    ///
    /// Sets: `task`.
    TaskSubmitted,
    /// A task was dispatched to a worker.
    ///
    /// Sets: `task`.
    TaskStarting,
    /// A task's work completed normally.
    ///
    /// Sets: `task`.
    TaskCompleted,
    /// A task's work returned an error.
    ///
    /// Sets: `task`, `reason`.
    TaskFailed,
    /// A task was cancelled (before or during execution).
    ///
    /// Sets: `task`.
    TaskCancelled,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Logical endpoint name (request/stream events).
    pub endpoint: Option<Arc<str>>,
    /// Task id rendered as a string (task events).
    pub task: Option<Arc<str>>,
    /// Attempt count (1-based for requests, 0-based reconnect counter for streams).
    pub attempt: Option<u32>,
    /// HTTP status, if the event has one.
    pub status: Option<u16>,
    /// Backoff delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            endpoint: None,
            task: None,
            attempt: None,
            status: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a logical endpoint name.
    #[inline]
    pub fn with_endpoint(mut self, endpoint: impl Into<Arc<str>>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Attaches a task identifier.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches an HTTP status code.
    #[inline]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}
