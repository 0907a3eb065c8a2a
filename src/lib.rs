//! # netvisor
//!
//! Resilient HTTP and streaming client library with priority task scheduling.
//!
//! Netvisor wraps the flaky parts of talking to a remote API behind three
//! cooperating components, with shared backoff, metrics, and lifecycle
//! events:
//!
//! ```text
//!                    ┌──────────────────┐
//!   RequestSpec ───► │ RequestExecutor  │ ──► typed JSON / RawResponse
//!                    └────────┬─────────┘
//!                             │ BackoffPolicy, CancellationToken
//!                    ┌────────┴─────────┐
//!   StreamSpec ────► │   StreamClient   │ ──► StreamMessage channel
//!                    └────────┬─────────┘
//!                             │
//!                    ┌────────┴─────────┐
//!   submit(work) ──► │  TaskScheduler   │ ──► TaskHandle<T>
//!                    └────────┬─────────┘
//!                             │
//!              ┌──────────────┼───────────────┐
//!              ▼              ▼               ▼
//!       MetricsCollector     Bus        SubscriberSet
//!       (counts, latency)  (events)    (fan-out, logs)
//! ```
//!
//! ## Components
//!
//! - [`RequestExecutor`] sends one logical HTTP request with retries,
//!   jittered exponential backoff, `Retry-After` handling, and cooperative
//!   cancellation.
//! - [`StreamClient`] keeps a server-sent-events subscription alive across
//!   failures, resuming via `Last-Event-ID` and ending cleanly on the
//!   `[DONE]` sentinel.
//! - [`TaskScheduler`] runs submitted async work under a concurrency cap,
//!   four priority levels (FIFO within each), group cancellation, and a
//!   lock-free single-coordinator design.
//! - [`MetricsCollector`] accumulates per-endpoint request statistics and
//!   task execution statistics; [`Bus`] broadcasts lifecycle [`Event`]s to
//!   [`Subscribe`] implementations.
//! - [`Runtime`] (via [`RuntimeBuilder`]) assembles all of the above from a
//!   single [`Config`], sharing one bus and one metrics collector.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use netvisor::{
//!     BackoffPolicy, Bus, HttpTransport, MetricsCollector, RequestExecutor, RequestSpec,
//! };
//! use reqwest::Method;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(HttpTransport::new(
//!         reqwest::Client::new(),
//!         Some(Duration::from_secs(30)),
//!     ));
//!     let metrics = Arc::new(MetricsCollector::new());
//!     let executor = RequestExecutor::new(
//!         transport,
//!         BackoffPolicy::conservative(),
//!         metrics.clone(),
//!         Bus::new(1024),
//!     );
//!
//!     let spec = RequestSpec::new("sessions.list", Method::GET, "https://api.example.com/v1/sessions")
//!         .with_bearer_token("secret");
//!     let sessions: serde_json::Value = executor
//!         .execute_json(&spec, &CancellationToken::new())
//!         .await?;
//!
//!     println!("{sessions}");
//!     println!("{:?}", metrics.snapshot().endpoint("sessions.list"));
//!     Ok(())
//! }
//! ```
//!
//! ## Cancellation model
//!
//! Cancellation is cooperative everywhere. Executor and stream drivers check
//! their token before each attempt and during every backoff sleep; scheduled
//! work receives a child token and is expected to observe it at natural
//! yield points. In-flight I/O is never forcibly aborted.

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod metrics;
pub mod policies;
pub mod runtime;
pub mod scheduler;
pub mod stream;
pub mod subscribers;

pub use config::Config;
pub use error::{RequestError, SchedulerError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use http::{HttpTransport, RawResponse, RequestExecutor, RequestSpec, Transport};
pub use metrics::{EndpointStats, MetricsCollector, MetricsSnapshot, TaskStats};
pub use policies::{BackoffPolicy, JitterRange};
pub use runtime::{Runtime, RuntimeBuilder};
pub use scheduler::{Priority, TaskHandle, TaskId, TaskScheduler};
pub use stream::{
    ConnectionState, EventParser, HttpStreamTransport, StreamClient, StreamEvent, StreamHandle,
    StreamMessage, StreamSpec, StreamTransport,
};
pub use subscribers::{LogSubscriber, Subscribe, SubscriberSet};
