//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes events to multiple subscribers concurrently
//! without blocking the publisher. [`SubscriberSet::attach`] is the
//! production wiring: it builds the set and forwards everything published on
//! a [`Bus`] into it.
//!
//! ## Architecture
//! ```text
//! Bus ──► listener ──► deliver(event)
//!                          │
//!                          ├──► [outbox 1] ──► worker 1 ──► subscriber1.on_event()
//!                          │    (bounded)          └──────► panic → SubscriberPanicked
//!                          └──► [outbox N] ──► worker N ──► subscriberN.on_event()
//!                               (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while
//!   B processes N+5.
//! - **Overflow**: event dropped for that subscriber only; `SubscriberOverflow`
//!   published (never re-published for overflow events themselves).
//! - **Non-blocking**: delivery uses `try_send` and returns immediately.
//! - **Isolation**: a slow or panicking subscriber doesn't affect others.
//! - **Per-subscriber FIFO**: each subscriber sees events in order.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Bounded queue feeding one subscriber's worker.
struct Outbox {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    outboxes: Vec<Outbox>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a set and spawns one worker task per subscriber.
    ///
    /// Each subscriber gets a bounded outbox (capacity from
    /// [`Subscribe::queue_capacity`], min 1) drained by a dedicated worker
    /// until the queue closes. Panics inside `on_event` are caught and
    /// reported as `SubscriberPanicked` on `bus`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut outboxes = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            outboxes.push(Outbox {
                name: sub.name(),
                tx,
            });
            workers.push(tokio::spawn(Self::drive(sub, rx, bus.clone())));
        }
        Self {
            outboxes,
            workers,
            bus,
        }
    }

    /// Builds a set over `subs` and forwards every event published on `bus`
    /// into it.
    ///
    /// This is the wiring used by the [`Runtime`](crate::Runtime): components
    /// keep publishing to the bus as usual and the returned set fans their
    /// events out to the subscribers.
    pub fn attach(subs: Vec<Arc<dyn Subscribe>>, bus: &Bus) -> Arc<Self> {
        let set = Arc::new(Self::new(subs, bus.clone()));
        Arc::clone(&set).listen(bus);
        set
    }

    /// Spawns a listener that forwards bus events into this set.
    ///
    /// The listener exits when the bus has no more senders; lagged receivers
    /// skip missed items and keep going.
    pub fn listen(self: Arc<Self>, bus: &Bus) {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => self.deliver(Arc::new(ev)),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Emits one event to all subscribers (clones the event).
    pub fn emit(&self, event: &Event) {
        self.deliver(Arc::new(event.clone()));
    }

    /// Hands a shared event to every outbox without blocking.
    ///
    /// A full or closed outbox drops the event for that subscriber and
    /// publishes a `SubscriberOverflow`, unless the event itself is an
    /// overflow report (which would loop).
    fn deliver(&self, event: Arc<Event>) {
        let overflow_report = matches!(event.kind, EventKind::SubscriberOverflow);

        for outbox in &self.outboxes {
            let reason = match outbox.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !overflow_report {
                self.bus
                    .publish(Event::subscriber_overflow(outbox.name, reason));
            }
        }
    }

    /// Worker loop for one subscriber: drain the outbox, isolate panics.
    async fn drive(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
        while let Some(ev) = rx.recv().await {
            let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
                .catch_unwind()
                .await;
            if let Err(panic) = handled {
                bus.publish(Event::subscriber_panicked(sub.name(), panic_message(panic)));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// Drops the outboxes (workers see their queue close), then awaits the
    /// worker tasks.
    pub async fn shutdown(self) {
        drop(self.outboxes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
