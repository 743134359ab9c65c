//! Tests for the send pipeline state machine.
//!
//! A scripted transport stands in for the HTTP collaborator; timer-driven
//! scenarios run under the paused tokio clock so backoff and reset waits
//! are observed exactly.

use async_trait::async_trait;
use herald::{
    DispatchConfig, FailureReason, Transport, TransportError, TransportErrorKind,
    TransportRequest, TransportResponse, Webhook,
};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const URL: &str = "https://discord.com/api/webhooks/42/token";

type ScriptEntry = Result<TransportResponse, TransportErrorKind>;

/// Transport that replays a fixed script and records when it was called.
struct MockTransport {
    script: Mutex<VecDeque<ScriptEntry>>,
    calls: Mutex<Vec<Instant>>,
}

impl MockTransport {
    fn new(script: Vec<ScriptEntry>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(
        &self,
        _request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(Instant::now());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(kind)) => Err(TransportError::new(kind)),
            None => panic!("transport called more times than scripted"),
        }
    }
}

fn response(
    status: u16,
    remaining: Option<&str>,
    reset_after: Option<&str>,
    body: &str,
) -> TransportResponse {
    let mut headers = HeaderMap::new();
    if let Some(value) = remaining {
        headers.insert("x-ratelimit-remaining", value.parse().unwrap());
    }
    if let Some(value) = reset_after {
        headers.insert("x-ratelimit-reset-after", value.parse().unwrap());
    }
    TransportResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: body.to_string(),
    }
}

fn webhook_with(script: Vec<ScriptEntry>, config: DispatchConfig) -> (Webhook, Arc<MockTransport>) {
    let transport = MockTransport::new(script);
    let webhook = Webhook::new_with_transport(URL, transport.clone(), config).unwrap();
    (webhook, transport)
}

#[tokio::test]
async fn test_success_updates_budget_from_headers() {
    let (webhook, transport) = webhook_with(
        vec![Ok(response(204, Some("4"), None, ""))],
        DispatchConfig::default(),
    );

    let outcome = webhook.send(r#"{"content":"hi"}"#).await;

    assert!(outcome.is_success());
    assert!(outcome.failure().is_none());
    assert_eq!(outcome.response().unwrap().status.as_u16(), 204);
    assert_eq!(transport.call_count(), 1);
    // Preflight spent one unit; the server agreed at 4.
    assert_eq!(webhook.remaining().await, 4);
    assert!(!webhook.is_rate_limited().await);
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let (webhook, transport) = webhook_with(
        vec![Ok(response(400, Some("3"), None, "invalid payload"))],
        DispatchConfig::default(),
    );

    let outcome = webhook.send("{}").await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.failure(), Some(&FailureReason::BadRequest));
    assert_eq!(outcome.response().unwrap().status.as_u16(), 400);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_malformed_transport_failure_refunds_budget() {
    let (webhook, transport) = webhook_with(
        vec![Err(TransportErrorKind::Malformed("bad header".into()))],
        DispatchConfig::default(),
    );

    let outcome = webhook.send("{}").await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.failure(), Some(&FailureReason::BadRequest));
    // The request never reached the server; no response, budget restored.
    assert!(outcome.response().is_none());
    assert_eq!(webhook.remaining().await, 5);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_unauthorized_invalidates_permanently() {
    let (webhook, transport) = webhook_with(
        vec![Ok(response(401, None, None, ""))],
        DispatchConfig::default(),
    );

    let outcome = webhook.send("{}").await;
    assert_eq!(outcome.failure(), Some(&FailureReason::InvalidWebhook));
    assert!(webhook.is_invalid());

    // Every subsequent send fails without touching the network.
    let outcome = webhook.send("{}").await;
    assert_eq!(outcome.failure(), Some(&FailureReason::InvalidWebhook));
    assert!(outcome.response().is_none());
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_not_found_invalidates_permanently() {
    let (webhook, transport) = webhook_with(
        vec![Ok(response(404, None, None, ""))],
        DispatchConfig::default(),
    );

    let outcome = webhook.send("{}").await;
    assert_eq!(outcome.failure(), Some(&FailureReason::InvalidWebhook));
    assert!(webhook.is_invalid());
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_pre_invalidated_handle_refuses_sends() {
    let (webhook, transport) = webhook_with(vec![], DispatchConfig::default());
    webhook.invalidate().await;

    let outcome = webhook.send("{}").await;
    assert_eq!(outcome.failure(), Some(&FailureReason::InvalidWebhook));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_schedule_on_network_failures() {
    let (webhook, transport) = webhook_with(
        vec![
            Err(TransportErrorKind::Network("timeout".into())),
            Err(TransportErrorKind::Network("timeout".into())),
            Err(TransportErrorKind::Network("timeout".into())),
        ],
        DispatchConfig::default(),
    );

    let outcome = webhook.send("{}").await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.failure(), Some(&FailureReason::UnexpectedFailure));
    assert!(outcome.response().is_none());

    // Waits between attempts follow 1s, 2s.
    let times = transport.call_times();
    assert_eq!(times.len(), 3);
    assert_eq!(times[1] - times[0], Duration::from_secs(1));
    assert_eq!(times[2] - times[1], Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_throttled_retry_waits_retry_after_plus_margin() {
    let (webhook, transport) = webhook_with(
        vec![
            Ok(response(
                429,
                Some("0"),
                Some("2.0"),
                r#"{"retry_after": 1.2}"#,
            )),
            Ok(response(204, Some("4"), None, "")),
        ],
        DispatchConfig::default(),
    );

    let outcome = webhook.send("{}").await;

    // Attempt 2 succeeded; the 429 label was overwritten by the definitive
    // outcome.
    assert!(outcome.is_success());
    assert!(outcome.failure().is_none());

    let times = transport.call_times();
    assert_eq!(times.len(), 2);
    // Body retry_after 1.2s plus the 0.5s safety margin.
    let wait = times[1] - times[0];
    assert!(wait >= Duration::from_millis(1_690) && wait <= Duration::from_millis(1_710));

    // The 429 left the handle throttled; the scheduled reset (2.0s header
    // plus margin) clears it.
    assert!(webhook.is_rate_limited().await);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!webhook.is_rate_limited().await);
    assert_eq!(webhook.remaining().await, 5);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_after_attempts_exhausted() {
    let config = DispatchConfig {
        max_attempts: 2,
        ..Default::default()
    };
    let (webhook, transport) = webhook_with(
        vec![
            Ok(response(429, Some("0"), Some("0.5"), r#"{"retry_after": 0.5}"#)),
            Ok(response(429, Some("0"), Some("0.5"), r#"{"retry_after": 0.5}"#)),
        ],
        config,
    );

    let outcome = webhook.send("{}").await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.failure(), Some(&FailureReason::RateLimited));
    assert_eq!(outcome.response().unwrap().status.as_u16(), 429);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_definitive_outcome_overwrites_sticky_label() {
    let config = DispatchConfig {
        max_attempts: 2,
        ..Default::default()
    };
    let (webhook, transport) = webhook_with(
        vec![
            Err(TransportErrorKind::Network("reset by peer".into())),
            Ok(response(429, Some("0"), Some("5.0"), r#"{"retry_after": 5.0}"#)),
        ],
        config,
    );

    let outcome = webhook.send("{}").await;

    assert_eq!(outcome.failure(), Some(&FailureReason::RateLimited));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_nonfinite_reset_after_header_survives() {
    // "inf" parses as a valid f64 from the header; the reset task must fall
    // back to the default window instead of panicking on the conversion.
    let (webhook, transport) = webhook_with(
        vec![
            Ok(response(
                429,
                Some("0"),
                Some("inf"),
                r#"{"retry_after": 0.25}"#,
            )),
            Ok(response(204, Some("4"), None, "")),
        ],
        DispatchConfig::default(),
    );

    let outcome = webhook.send("{}").await;

    assert!(outcome.is_success());
    assert_eq!(transport.call_count(), 2);

    // The throttle clears after the default 1.0s window plus margin, not
    // after an unbounded wait.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!webhook.is_rate_limited().await);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_retry_after_body_is_clamped() {
    let config = DispatchConfig {
        max_attempts: 2,
        ..Default::default()
    };
    let (webhook, transport) = webhook_with(
        vec![
            Ok(response(
                429,
                Some("0"),
                Some("1.0"),
                r#"{"retry_after": 1e300}"#,
            )),
            Ok(response(204, Some("4"), None, "")),
        ],
        config,
    );

    let outcome = webhook.send("{}").await;

    assert!(outcome.is_success());
    let times = transport.call_times();
    assert_eq!(times.len(), 2);
    // The absurd body value is capped at the one-hour ceiling plus margin.
    let wait = times[1] - times[0];
    assert!(
        wait >= Duration::from_secs(3_600) && wait <= Duration::from_secs(3_601),
        "retry waited {:?}",
        wait
    );
}

#[tokio::test]
async fn test_unrecognized_status_terminates_immediately() {
    let (webhook, transport) = webhook_with(
        vec![Ok(response(500, Some("3"), None, "internal error"))],
        DispatchConfig::default(),
    );

    let outcome = webhook.send("{}").await;

    assert!(!outcome.is_success());
    let failure = outcome.failure().unwrap();
    assert_eq!(
        failure,
        &FailureReason::Http {
            status: 500,
            message: "internal error".to_string(),
        }
    );
    assert_eq!(format!("{}", failure), "HTTP 500: internal error");
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_queue_fails_fast() {
    let config = DispatchConfig {
        queue_max: 0,
        max_attempts: 1,
        ..Default::default()
    };
    let (webhook, transport) = webhook_with(
        vec![Ok(response(429, Some("0"), Some("60.0"), r#"{"retry_after": 60.0}"#))],
        config,
    );

    let outcome = webhook.send("{}").await;
    assert_eq!(outcome.failure(), Some(&FailureReason::RateLimited));

    // Throttled with no queue slots: the next send fails without enqueueing
    // or touching the network.
    let outcome = webhook.send("{}").await;
    assert_eq!(outcome.failure(), Some(&FailureReason::ExhaustedQueue));
    assert_eq!(webhook.queued().await, 0);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_queued_send_released_after_reset() {
    let (webhook, transport) = webhook_with(
        vec![
            Ok(response(
                429,
                Some("0"),
                Some("2.0"),
                r#"{"retry_after": 2.0}"#,
            )),
            Ok(response(204, Some("4"), None, "")),
            Ok(response(204, Some("3"), None, "")),
        ],
        DispatchConfig::default(),
    );
    let webhook = Arc::new(webhook);

    let first = {
        let webhook = Arc::clone(&webhook);
        tokio::spawn(async move { webhook.send("{}").await })
    };

    // Let the first send hit the 429 and start its retry wait.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(webhook.is_rate_limited().await);

    let start = Instant::now();
    let second = {
        let webhook = Arc::clone(&webhook);
        tokio::spawn(async move { webhook.send("{}").await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(webhook.queued().await, 1);

    let second_outcome = second.await.unwrap();
    assert!(second_outcome.is_success());
    // Released by the reset scheduled for 2.0s + 0.5s margin after the 429.
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(2_300) && elapsed <= Duration::from_millis(2_600),
        "queued send released after {:?}",
        elapsed
    );

    let first_outcome = first.await.unwrap();
    assert!(first_outcome.is_success());
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_invalidation_wakes_queued_sender() {
    let config = DispatchConfig {
        max_attempts: 1,
        ..Default::default()
    };
    let (webhook, transport) = webhook_with(
        vec![Ok(response(
            429,
            Some("0"),
            Some("60.0"),
            r#"{"retry_after": 60.0}"#,
        ))],
        config,
    );
    let webhook = Arc::new(webhook);

    let outcome = webhook.send("{}").await;
    assert_eq!(outcome.failure(), Some(&FailureReason::RateLimited));

    let queued = {
        let webhook = Arc::clone(&webhook);
        tokio::spawn(async move { webhook.send("{}").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(webhook.queued().await, 1);

    // Invalidation must wake the queued sender, which re-checks the flag
    // after resuming instead of proceeding to send.
    webhook.invalidate().await;
    let outcome = queued.await.unwrap();
    assert_eq!(outcome.failure(), Some(&FailureReason::InvalidWebhook));
    assert!(outcome.response().is_none());
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_invalid_url_rejected_at_construction() {
    assert!(Webhook::new("not a url").is_err());
    assert!(Webhook::new("ftp://example.com/hook").is_err());
    assert!(Webhook::new("https://discord.com/api/webhooks/1/t").is_ok());
}
