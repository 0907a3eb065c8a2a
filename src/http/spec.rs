//! # Request specification.
//!
//! [`RequestSpec`] bundles everything one logical HTTP request needs: the
//! endpoint name used for metrics, the wire-level method/URL/headers, an
//! optional JSON body, an optional bearer token, and a per-attempt timeout.
//!
//! A spec is built once and reused across retry attempts; the transport
//! constructs a fresh wire request from it per attempt.

use std::borrow::Cow;
use std::time::Duration;

use reqwest::Method;

/// Specification for one logical HTTP request.
///
/// ## Example
/// ```rust
/// use netvisor::RequestSpec;
/// use reqwest::Method;
/// use std::time::Duration;
///
/// let spec = RequestSpec::new("sessions.list", Method::GET, "https://api.example.com/v1/sessions")
///     .with_header("X-Client", "mobile")
///     .with_bearer_token("secret")
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(spec.endpoint, "sessions.list");
/// ```
#[derive(Clone, Debug)]
pub struct RequestSpec {
    /// Logical endpoint name, used as the metrics key and in events.
    pub endpoint: Cow<'static, str>,
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Extra request headers (applied in order).
    pub headers: Vec<(String, String)>,
    /// Optional JSON body (sent with a JSON content type).
    pub body: Option<serde_json::Value>,
    /// Optional bearer token for the `Authorization` header.
    pub bearer_token: Option<String>,
    /// Per-attempt timeout (`None` = transport default).
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    /// Creates a spec with no headers, body, auth, or timeout override.
    pub fn new(
        endpoint: impl Into<Cow<'static, str>>,
        method: Method,
        url: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            bearer_token: None,
            timeout: None,
        }
    }

    /// Appends one request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
