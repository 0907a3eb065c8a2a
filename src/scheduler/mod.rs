//! # Task scheduling: priorities, bounded concurrency, cooperative cancellation.
//!
//! - [`priority`] — [`Priority`] levels and [`TaskId`]
//! - [`handle`] — [`TaskHandle`], the caller's view of one task
//! - [`core`] — [`TaskScheduler`] and its coordinator loop

pub mod core;
pub mod handle;
pub mod priority;

pub(crate) mod task;

pub use self::core::TaskScheduler;
pub use handle::TaskHandle;
pub use priority::{Priority, TaskId};
