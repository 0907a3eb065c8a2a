//! # Streaming layer: SSE parsing and auto-reconnecting subscriptions.
//!
//! - [`event`] — [`StreamEvent`], one decoded server-sent event
//! - [`parser`] — [`EventParser`], incremental wire-format decoding
//! - [`transport`] — the [`StreamTransport`] seam and its reqwest implementation
//! - [`client`] — [`StreamClient`], reconnect loop and subscription handles

pub mod client;
pub mod event;
pub mod parser;
pub mod transport;

pub use client::{ConnectionState, StreamClient, StreamHandle, StreamMessage, StreamSpec};
pub use event::StreamEvent;
pub use parser::EventParser;
pub use transport::{ByteStream, HttpStreamTransport, StreamTransport};
