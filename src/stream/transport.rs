//! # Transport seam for the stream client.
//!
//! [`StreamTransport`] opens one streaming connection and hands back a byte
//! stream; reconnect policy and SSE framing stay in the client. Production
//! uses [`HttpStreamTransport`] (reqwest); tests use scripted fakes.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL, RETRY_AFTER};
use url::Url;

use crate::error::RequestError;

/// Raw bytes off one streaming connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RequestError>> + Send>>;

/// Opens one streaming connection.
///
/// A non-2xx handshake is an `Err` with the classified status error; once a
/// 2xx arrives, body-read failures surface as `Err` items inside the stream.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    /// Opens the connection, resuming from `last_event_id` when given.
    async fn open(
        &self,
        url: &str,
        headers: &[(String, String)],
        last_event_id: Option<&str>,
    ) -> Result<ByteStream, RequestError>;
}

/// Production transport backed by a shared [`reqwest::Client`].
pub struct HttpStreamTransport {
    http: reqwest::Client,
}

impl HttpStreamTransport {
    /// Wraps an existing client.
    ///
    /// The client must not carry a global request timeout: a healthy stream
    /// stays open indefinitely.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl StreamTransport for HttpStreamTransport {
    async fn open(
        &self,
        url: &str,
        headers: &[(String, String)],
        last_event_id: Option<&str>,
    ) -> Result<ByteStream, RequestError> {
        let url = Url::parse(url).map_err(|e| RequestError::Transport {
            message: format!("invalid url: {e}"),
        })?;

        let mut builder = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(id) = last_event_id {
            builder = builder.header("Last-Event-ID", id);
        }

        let resp = builder.send().await.map_err(|e| RequestError::Transport {
            message: e.to_string(),
        })?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = resp.text().await.unwrap_or_default();
            return Err(RequestError::from_status(status, body, retry_after));
        }

        let stream = resp.bytes_stream().map(|item| {
            item.map_err(|e| RequestError::Transport {
                message: e.to_string(),
            })
        });
        Ok(Box::pin(stream))
    }
}
