//! # Request executor: one logical request, many attempts.
//!
//! [`RequestExecutor`] drives a [`RequestSpec`] through its [`Transport`],
//! applying the [`BackoffPolicy`] across attempts, classifying responses,
//! and honoring cooperative cancellation.
//!
//! ## Attempt flow
//! ```text
//! loop {
//!   ├─► token cancelled? → return Cancelled
//!   ├─► publish RequestStarting
//!   ├─► transport.send(spec)            (one wire attempt)
//!   ├─► record metrics sample (endpoint, success?, latency)
//!   ├─► 2xx → publish RequestSucceeded → decode → return
//!   ├─► error → publish RequestFailed
//!   ├─► policy.should_retry(err, attempt)? no → return last error verbatim
//!   ├─► delay = Retry-After (if 429, within cap) else policy.delay(attempt)
//!   ├─► publish RequestRetryScheduled
//!   └─► sleep(delay)   ← aborted by cancellation → return Cancelled
//! }
//! ```
//!
//! ## Rules
//! - One unified attempt counter covers rate-limit and server-error retries.
//! - The token is checked **before each attempt** and **during each backoff
//!   sleep**; in-flight I/O is never forcibly aborted.
//! - A decode failure after a 2xx is terminal (`Decoding`), never retried.
//! - Every attempt reports exactly one metrics sample.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::RequestError;
use crate::events::{Bus, Event, EventKind};
use crate::http::spec::RequestSpec;
use crate::http::transport::{RawResponse, Transport};
use crate::metrics::MetricsCollector;
use crate::policies::BackoffPolicy;

/// Retrying executor for logical HTTP requests.
///
/// Cheap to clone; all fields are shared handles.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    policy: BackoffPolicy,
    metrics: Arc<MetricsCollector>,
    bus: Bus,
}

impl RequestExecutor {
    /// Creates an executor over the given transport.
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: BackoffPolicy,
        metrics: Arc<MetricsCollector>,
        bus: Bus,
    ) -> Self {
        Self {
            transport,
            policy,
            metrics,
            bus,
        }
    }

    /// Executes the request and decodes a 2xx body as JSON into `T`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        token: &CancellationToken,
    ) -> Result<T, RequestError> {
        let raw = self.execute_raw(spec, token).await?;
        serde_json::from_slice(&raw.body).map_err(|e| RequestError::Decoding {
            message: e.to_string(),
        })
    }

    /// Executes the request and returns the raw 2xx response.
    ///
    /// Non-2xx outcomes surface as the classified [`RequestError`] once the
    /// retry budget is spent; cancellation surfaces as
    /// [`RequestError::Cancelled`] at the next checkpoint.
    pub async fn execute_raw(
        &self,
        spec: &RequestSpec,
        token: &CancellationToken,
    ) -> Result<RawResponse, RequestError> {
        let endpoint: Arc<str> = Arc::from(spec.endpoint.as_ref());
        let mut attempt: u32 = 0;

        loop {
            if token.is_cancelled() {
                return Err(RequestError::Cancelled);
            }

            attempt += 1;
            self.bus.publish(
                Event::new(EventKind::RequestStarting)
                    .with_endpoint(endpoint.clone())
                    .with_attempt(attempt),
            );

            let started = Instant::now();
            let outcome = self.transport.send(spec).await;
            let latency = started.elapsed();

            let err = match outcome {
                Ok(raw) if raw.is_success() => {
                    self.metrics.record_request(&endpoint, true, latency);
                    self.bus.publish(
                        Event::new(EventKind::RequestSucceeded)
                            .with_endpoint(endpoint.clone())
                            .with_attempt(attempt)
                            .with_status(raw.status),
                    );
                    return Ok(raw);
                }
                Ok(raw) => {
                    let status = raw.status;
                    let err = raw.into_error();
                    self.metrics.record_request(&endpoint, false, latency);
                    self.bus.publish(
                        Event::new(EventKind::RequestFailed)
                            .with_endpoint(endpoint.clone())
                            .with_attempt(attempt)
                            .with_status(status)
                            .with_reason(err.to_string()),
                    );
                    err
                }
                Err(err) => {
                    self.metrics.record_request(&endpoint, false, latency);
                    self.bus.publish(
                        Event::new(EventKind::RequestFailed)
                            .with_endpoint(endpoint.clone())
                            .with_attempt(attempt)
                            .with_reason(err.to_string()),
                    );
                    err
                }
            };

            if !self.policy.should_retry(&err, attempt) {
                return Err(err);
            }

            let delay = match &err {
                // Server-directed delay wins when it fits under the cap.
                RequestError::RateLimited {
                    retry_after: Some(d),
                } if *d <= self.policy.max => *d,
                _ => self.policy.delay(attempt),
            };

            self.bus.publish(
                Event::new(EventKind::RequestRetryScheduled)
                    .with_endpoint(endpoint.clone())
                    .with_attempt(attempt)
                    .with_delay(delay),
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => return Err(RequestError::Cancelled),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::JitterRange;
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::Method;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted outcome per attempt; the last entry repeats.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<RawResponse, RequestError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawResponse, RequestError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _spec: &RequestSpec) -> Result<RawResponse, RequestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                match &script[0] {
                    Ok(raw) => Ok(raw.clone()),
                    Err(e) => Err(RequestError::Transport {
                        message: e.to_string(),
                    }),
                }
            }
        }
    }

    fn ok_response(body: &'static [u8]) -> RawResponse {
        RawResponse {
            status: 200,
            retry_after: None,
            body: Bytes::from_static(body),
        }
    }

    fn status_response(status: u16, retry_after: Option<Duration>) -> RawResponse {
        RawResponse {
            status,
            retry_after,
            body: Bytes::new(),
        }
    }

    fn transport_err() -> Result<RawResponse, RequestError> {
        Err(RequestError::Transport {
            message: "connection reset".into(),
        })
    }

    fn fast_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            first: Duration::from_millis(10),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: JitterRange::none(),
        }
    }

    fn executor(
        transport: Arc<ScriptedTransport>,
        policy: BackoffPolicy,
    ) -> (RequestExecutor, Arc<MetricsCollector>) {
        let metrics = Arc::new(MetricsCollector::new());
        let exec = RequestExecutor::new(transport, policy, metrics.clone(), Bus::new(64));
        (exec, metrics)
    }

    fn spec() -> RequestSpec {
        RequestSpec::new("chat.send", Method::POST, "https://api.example.com/chat")
    }

    #[derive(Debug, Deserialize)]
    struct Reply {
        answer: String,
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fail_succeed_reports_three_attempts() {
        let transport = ScriptedTransport::new(vec![
            transport_err(),
            transport_err(),
            Ok(ok_response(b"{\"answer\":\"hi\"}")),
        ]);
        let (exec, metrics) = executor(transport.clone(), fast_policy(3));

        let reply: Reply = exec
            .execute_json(&spec(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.answer, "hi");
        assert_eq!(transport.calls(), 3);

        let stats = metrics.snapshot();
        let ep = stats.endpoint("chat.send").unwrap();
        assert_eq!(ep.count, 3);
        assert_eq!(ep.success_count, 1);
        assert_eq!(ep.failure_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_surfaces_last_error_verbatim() {
        let transport = ScriptedTransport::new(vec![Ok(status_response(503, None))]);
        let (exec, _) = executor(transport.clone(), fast_policy(3));

        let err = exec
            .execute_raw(&spec(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Server { status: 503, .. }));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_client_error_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(status_response(404, None))]);
        let (exec, metrics) = executor(transport.clone(), fast_policy(3));

        let err = exec
            .execute_raw(&spec(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Client { status: 404, .. }));
        assert_eq!(transport.calls(), 1);
        assert_eq!(metrics.snapshot().endpoint("chat.send").unwrap().count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_is_honored_within_cap() {
        let transport = ScriptedTransport::new(vec![
            Ok(status_response(429, Some(Duration::from_millis(700)))),
            Ok(ok_response(b"{}")),
        ]);
        let (exec, _) = executor(transport.clone(), fast_policy(3));

        let started = tokio::time::Instant::now();
        exec.execute_raw(&spec(), &CancellationToken::new())
            .await
            .unwrap();
        let waited = started.elapsed();
        // policy delay would be 10ms; the server-directed 700ms must win
        assert!(waited >= Duration::from_millis(700), "waited {waited:?}");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_beyond_cap_falls_back_to_policy() {
        let transport = ScriptedTransport::new(vec![
            Ok(status_response(429, Some(Duration::from_secs(600)))),
            Ok(ok_response(b"{}")),
        ]);
        let (exec, _) = executor(transport.clone(), fast_policy(3));

        let started = tokio::time::Instant::now();
        exec.execute_raw(&spec(), &CancellationToken::new())
            .await
            .unwrap();
        // falls back to the 10ms policy delay instead of 600s
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_aborts_immediately() {
        let transport = ScriptedTransport::new(vec![transport_err()]);
        let mut policy = fast_policy(3);
        policy.first = Duration::from_secs(60);

        let (exec, _) = executor(transport.clone(), policy);
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let err = exec.execute_raw(&spec(), &token).await.unwrap_err();
        assert!(matches!(err, RequestError::Cancelled));
        assert_eq!(transport.calls(), 1, "no attempt after cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_token_never_sends() {
        let transport = ScriptedTransport::new(vec![Ok(ok_response(b"{}"))]);
        let (exec, _) = executor(transport.clone(), fast_policy(3));
        let token = CancellationToken::new();
        token.cancel();

        let err = exec.execute_raw(&spec(), &token).await.unwrap_err();
        assert!(matches!(err, RequestError::Cancelled));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_failure_is_terminal() {
        let transport = ScriptedTransport::new(vec![Ok(ok_response(b"not json"))]);
        let (exec, _) = executor(transport.clone(), fast_policy(3));

        let err = exec
            .execute_json::<Reply>(&spec(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Decoding { .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_events_published() {
        let transport =
            ScriptedTransport::new(vec![transport_err(), Ok(ok_response(b"{}"))]);
        let metrics = Arc::new(MetricsCollector::new());
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let exec = RequestExecutor::new(transport, fast_policy(3), metrics, bus);

        exec.execute_raw(&spec(), &CancellationToken::new())
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::RequestStarting,
                EventKind::RequestFailed,
                EventKind::RequestRetryScheduled,
                EventKind::RequestStarting,
                EventKind::RequestSucceeded,
            ]
        );
    }
}
