//! Subscriber fan-out for lifecycle events.
//!
//! - [`Subscribe`] — the handler contract (dedicated worker, bounded queue)
//! - [`SubscriberSet`] — non-blocking fan-out with overflow reporting and
//!   panic isolation
//! - [`LogSubscriber`] — renders events through `tracing`

mod log;
mod set;
mod subscribe;

pub use log::LogSubscriber;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
