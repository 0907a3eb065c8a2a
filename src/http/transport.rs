//! # Transport seam for the request executor.
//!
//! [`Transport`] performs exactly one wire attempt for a [`RequestSpec`] and
//! reports the raw outcome; classification and retry decisions stay in the
//! executor. Production uses [`HttpTransport`] (reqwest); tests use scripted
//! fakes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::RETRY_AFTER;
use url::Url;

use crate::error::RequestError;
use crate::http::spec::RequestSpec;

/// Raw result of one attempt that reached the server.
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed `Retry-After` header (seconds form), if present.
    pub retry_after: Option<Duration>,
    /// Response body bytes.
    pub body: Bytes,
}

impl RawResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Consumes the response into the classified error for its status.
    ///
    /// Must only be called on non-2xx responses.
    pub fn into_error(self) -> RequestError {
        let body = String::from_utf8_lossy(&self.body).into_owned();
        RequestError::from_status(self.status, body, self.retry_after)
    }
}

/// One wire attempt.
///
/// Implementations map their own failures onto [`RequestError::Transport`] /
/// [`RequestError::Timeout`]; any response with a status, including errors,
/// is returned as `Ok(RawResponse)`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends the request once and returns the raw response.
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, RequestError>;
}

/// Production transport backed by a shared [`reqwest::Client`].
pub struct HttpTransport {
    http: reqwest::Client,
    default_timeout: Option<Duration>,
}

impl HttpTransport {
    /// Wraps an existing client (connection pool is shared with the caller).
    pub fn new(http: reqwest::Client, default_timeout: Option<Duration>) -> Self {
        Self {
            http,
            default_timeout,
        }
    }

    fn map_send_error(err: reqwest::Error, timeout: Option<Duration>) -> RequestError {
        if err.is_timeout() {
            RequestError::Timeout {
                timeout: timeout.unwrap_or(Duration::ZERO),
            }
        } else {
            RequestError::Transport {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, RequestError> {
        let url = Url::parse(&spec.url).map_err(|e| RequestError::Transport {
            message: format!("invalid url: {e}"),
        })?;

        let mut builder = self.http.request(spec.method.clone(), url);

        for (name, value) in &spec.headers {
            builder = builder.header(name, value);
        }
        if let Some(token) = &spec.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }

        let timeout = spec.timeout.or(self.default_timeout);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;

        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = resp
            .bytes()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}
