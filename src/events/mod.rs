//! Lifecycle events and the broadcast bus that carries them.
//!
//! Every component publishes its lifecycle to a shared [`Bus`]; subscribers
//! (logging, custom metrics, UI glue) consume events through the
//! [`subscribers`](crate::subscribers) fan-out without slowing publishers.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
