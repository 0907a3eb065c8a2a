//! # HTTP layer: request specs, transports, and the retrying executor.
//!
//! - [`spec`] — [`RequestSpec`], the declarative description of one logical request
//! - [`transport`] — the [`Transport`] seam and its reqwest-backed implementation
//! - [`executor`] — [`RequestExecutor`], the retry/backoff/cancellation loop

pub mod executor;
pub mod spec;
pub mod transport;

pub use executor::RequestExecutor;
pub use spec::RequestSpec;
pub use transport::{HttpTransport, RawResponse, Transport};
