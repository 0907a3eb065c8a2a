//! # Runtime assembly: one [`Config`], every component wired.
//!
//! [`RuntimeBuilder`] turns a single [`Config`] into a ready-to-use
//! [`Runtime`]: a shared [`Bus`] sized by `bus_capacity`, a shared
//! [`MetricsCollector`], reqwest-backed transports carrying the configured
//! request timeout, an executor and stream client driven by the configured
//! backoff, and the scheduler with its concurrency ceiling and submission
//! queue. Registered subscribers are attached to the bus so every component's
//! lifecycle events reach them.
//!
//! Components remain usable standalone; the runtime only removes the wiring
//! boilerplate. Building spawns tasks and therefore requires a tokio runtime.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use netvisor::{Config, LogSubscriber, Priority, Runtime};
//!
//! #[tokio::main]
//! async fn main() {
//!     let runtime = Runtime::builder()
//!         .with_config(Config::default())
//!         .with_subscriber(Arc::new(LogSubscriber))
//!         .build();
//!
//!     let handle = runtime
//!         .scheduler()
//!         .submit(Priority::High, Some("warmup"), |_| async { Ok(()) })
//!         .unwrap();
//!     handle.join().await.unwrap();
//! }
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::events::Bus;
use crate::http::{HttpTransport, RequestExecutor};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::policies::BackoffPolicy;
use crate::scheduler::TaskScheduler;
use crate::stream::{HttpStreamTransport, StreamClient};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    config: Config,
    http: Option<reqwest::Client>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RuntimeBuilder {
    /// Starts from [`Config::default`], no subscribers, a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            http: None,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Overrides the backoff policy, keeping the rest of the configuration.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Uses an existing `reqwest::Client` (shares its connection pool).
    ///
    /// The client must not carry a global timeout of its own; per-attempt
    /// timeouts come from [`Config::request_timeout`] and stream connections
    /// stay open indefinitely.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Registers an event subscriber.
    pub fn with_subscriber(mut self, sub: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(sub);
        self
    }

    /// Wires everything up. Spawns the scheduler coordinator and, when
    /// subscribers were registered, the fan-out workers and bus listener.
    pub fn build(self) -> Runtime {
        let http = self.http.unwrap_or_default();
        let bus = Bus::new(self.config.bus_capacity_clamped());
        let metrics = Arc::new(MetricsCollector::new());

        let subscribers = if self.subscribers.is_empty() {
            None
        } else {
            Some(SubscriberSet::attach(self.subscribers, &bus))
        };

        let transport = Arc::new(HttpTransport::new(
            http.clone(),
            self.config.default_timeout(),
        ));
        let executor = RequestExecutor::new(
            transport,
            self.config.backoff,
            Arc::clone(&metrics),
            bus.clone(),
        );
        let stream = StreamClient::new(
            Arc::new(HttpStreamTransport::new(http)),
            self.config.backoff,
            bus.clone(),
        );
        let scheduler = TaskScheduler::new(&self.config, Arc::clone(&metrics), bus.clone());

        Runtime {
            bus,
            metrics,
            executor,
            stream,
            scheduler,
            subscribers,
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembled component stack sharing one bus, one metrics collector, and one
/// configuration.
pub struct Runtime {
    bus: Bus,
    metrics: Arc<MetricsCollector>,
    executor: RequestExecutor,
    stream: StreamClient,
    scheduler: TaskScheduler,
    subscribers: Option<Arc<SubscriberSet>>,
}

impl Runtime {
    /// Entry point; same as [`RuntimeBuilder::new`].
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// The retrying HTTP executor.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// The auto-reconnecting stream client.
    pub fn stream(&self) -> &StreamClient {
        &self.stream
    }

    /// The priority task scheduler.
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// The shared event bus (for extra ad-hoc receivers).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Detached snapshot of all request and task statistics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// True when at least one subscriber is attached.
    pub fn has_subscribers(&self) -> bool {
        self.subscribers.is_some()
    }
}
