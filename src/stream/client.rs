//! # Streaming client: auto-reconnecting SSE subscriptions.
//!
//! [`StreamClient::connect`] spawns one driver task per subscription and hands
//! back a message channel plus a [`StreamHandle`] for stopping it.
//!
//! ## Lifecycle
//! ```text
//! Connecting ──► Connected ──► (events...) ──► Done / graceful end ──► Disconnected
//!     │              │
//!     │              └─ transport error ──► Failed ──► Reconnecting ──► Connecting
//!     └─ handshake error ─────────────────────┘              │
//!                                                            └─ retries exhausted ──► Disconnected
//! ```
//!
//! ## Rules
//! - At most one transport connection lives per subscription at any time;
//!   reconnects happen strictly sequentially.
//! - The reconnect counter resets to zero on every successful connection.
//! - The latest `id:` seen is replayed as `Last-Event-ID` on reconnects.
//! - The `[DONE]` sentinel ends the logical stream; no reconnect follows it.
//! - [`StreamHandle::stop`] is idempotent; dropping the receiver also tears
//!   the subscription down.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::RequestError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::stream::event::StreamEvent;
use crate::stream::parser::EventParser;
use crate::stream::transport::{ByteStream, StreamTransport};

use futures::StreamExt;

/// Depth of the per-subscription message channel.
const CHANNEL_CAPACITY: usize = 256;

/// Connection state of one subscription, reported through the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport is open and none will be opened.
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// The transport handshake succeeded; events may flow.
    Connected,
    /// A reconnect is scheduled after a failure (`attempt` counts failures
    /// since the last successful connection).
    Reconnecting {
        /// Consecutive failures since the last successful connection.
        attempt: u32,
    },
    /// The last attempt failed with the given reason.
    Failed {
        /// Short failure description.
        reason: Arc<str>,
    },
}

/// One message delivered to the subscription's consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    /// The connection state changed.
    State(ConnectionState),
    /// A server event arrived.
    Event(StreamEvent),
    /// The server sent the end-of-stream sentinel.
    Done,
}

/// Caller-side control for one subscription.
#[derive(Clone, Debug)]
pub struct StreamHandle {
    token: CancellationToken,
}

impl StreamHandle {
    /// Stops the subscription. Idempotent; the driver tears down at its next
    /// checkpoint and reports `Disconnected`.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// True once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Streaming subscription specification.
#[derive(Clone, Debug)]
pub struct StreamSpec {
    /// Logical endpoint name, used as the metrics/event key.
    pub endpoint: String,
    /// Absolute subscription URL.
    pub url: String,
    /// Extra request headers (applied in order).
    pub headers: Vec<(String, String)>,
}

impl StreamSpec {
    /// Creates a spec with no extra headers.
    pub fn new(endpoint: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Appends one request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Auto-reconnecting SSE client. Cheap to clone.
#[derive(Clone)]
pub struct StreamClient {
    transport: Arc<dyn StreamTransport>,
    policy: BackoffPolicy,
    bus: Bus,
}

impl StreamClient {
    /// Creates a client over the given transport.
    pub fn new(transport: Arc<dyn StreamTransport>, policy: BackoffPolicy, bus: Bus) -> Self {
        Self {
            transport,
            policy,
            bus,
        }
    }

    /// Opens a subscription and returns its message channel and handle.
    ///
    /// The driver task runs until the sentinel, a graceful server close,
    /// retry exhaustion, or [`StreamHandle::stop`]. The final message on a
    /// clean teardown is always `State(Disconnected)`.
    pub fn connect(&self, spec: StreamSpec) -> (mpsc::Receiver<StreamMessage>, StreamHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = CancellationToken::new();
        let handle = StreamHandle {
            token: token.clone(),
        };

        let driver = Driver {
            transport: self.transport.clone(),
            policy: self.policy,
            bus: self.bus.clone(),
            spec,
            tx,
            token,
        };
        tokio::spawn(driver.run());

        (rx, handle)
    }
}

/// Why one connection ended.
enum ConnectionEnd {
    /// `[DONE]` arrived; the logical stream is complete.
    Done,
    /// The server closed the body without a sentinel.
    Graceful,
    /// The consumer went away or `stop()` fired.
    Stopped,
    /// The transport failed mid-read or at handshake.
    Failed(RequestError),
}

struct Driver {
    transport: Arc<dyn StreamTransport>,
    policy: BackoffPolicy,
    bus: Bus,
    spec: StreamSpec,
    tx: mpsc::Sender<StreamMessage>,
    token: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        let endpoint: Arc<str> = Arc::from(self.spec.endpoint.as_str());
        let mut attempt: u32 = 0;
        let mut last_event_id: Option<String> = None;

        loop {
            if self.token.is_cancelled() {
                self.finish(&endpoint, None).await;
                return;
            }

            self.send(StreamMessage::State(ConnectionState::Connecting))
                .await;
            self.bus.publish(
                Event::new(EventKind::StreamConnecting)
                    .with_endpoint(endpoint.clone())
                    .with_attempt(attempt),
            );

            let opened = select! {
                r = self
                    .transport
                    .open(&self.spec.url, &self.spec.headers, last_event_id.as_deref()) => r,
                _ = self.token.cancelled() => {
                    self.finish(&endpoint, None).await;
                    return;
                }
            };

            let end = match opened {
                Ok(stream) => {
                    attempt = 0;
                    self.send(StreamMessage::State(ConnectionState::Connected))
                        .await;
                    self.bus
                        .publish(Event::new(EventKind::StreamConnected).with_endpoint(endpoint.clone()));
                    self.read(stream, &mut last_event_id).await
                }
                Err(err) => ConnectionEnd::Failed(err),
            };

            match end {
                ConnectionEnd::Done => {
                    self.send(StreamMessage::Done).await;
                    self.bus
                        .publish(Event::new(EventKind::StreamCompleted).with_endpoint(endpoint.clone()));
                    self.finish(&endpoint, None).await;
                    return;
                }
                ConnectionEnd::Graceful | ConnectionEnd::Stopped => {
                    self.finish(&endpoint, None).await;
                    return;
                }
                ConnectionEnd::Failed(err) => {
                    let reason: Arc<str> = Arc::from(err.to_string());
                    self.send(StreamMessage::State(ConnectionState::Failed {
                        reason: reason.clone(),
                    }))
                    .await;

                    attempt += 1;
                    if !self.policy.should_retry(&err, attempt) {
                        self.finish(&endpoint, Some(reason)).await;
                        return;
                    }

                    let delay = self.policy.delay(attempt);
                    self.send(StreamMessage::State(ConnectionState::Reconnecting { attempt }))
                        .await;
                    self.bus.publish(
                        Event::new(EventKind::StreamReconnectScheduled)
                            .with_endpoint(endpoint.clone())
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_reason(reason),
                    );

                    let sleep = time::sleep(delay);
                    tokio::pin!(sleep);
                    select! {
                        _ = &mut sleep => {}
                        _ = self.token.cancelled() => {
                            self.finish(&endpoint, None).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Reads one connection to its end, forwarding events as they complete.
    async fn read(
        &mut self,
        mut stream: ByteStream,
        last_event_id: &mut Option<String>,
    ) -> ConnectionEnd {
        let mut parser = EventParser::new();
        loop {
            let item = select! {
                item = stream.next() => item,
                _ = self.token.cancelled() => return ConnectionEnd::Stopped,
            };
            match item {
                Some(Ok(chunk)) => {
                    for event in parser.feed(&chunk) {
                        if let Some(id) = &event.id {
                            *last_event_id = Some(id.clone());
                        }
                        if event.is_done() {
                            return ConnectionEnd::Done;
                        }
                        if self.tx.send(StreamMessage::Event(event)).await.is_err() {
                            return ConnectionEnd::Stopped;
                        }
                    }
                }
                Some(Err(err)) => return ConnectionEnd::Failed(err),
                None => return ConnectionEnd::Graceful,
            }
        }
    }

    /// Terminal `Disconnected` report, with the ending reason when abnormal.
    async fn finish(&self, endpoint: &Arc<str>, reason: Option<Arc<str>>) {
        self.send(StreamMessage::State(ConnectionState::Disconnected))
            .await;
        let mut ev = Event::new(EventKind::StreamDisconnected).with_endpoint(endpoint.clone());
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
    }

    async fn send(&self, msg: StreamMessage) {
        // A dropped receiver ends the subscription at the next checkpoint.
        let _ = self.tx.send(msg).await;
    }
}
