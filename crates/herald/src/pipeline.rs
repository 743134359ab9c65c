//! The send pipeline: queueing, budget accounting, and the attempt loop.
//!
//! One logical send walks a fixed sequence of states:
//!
//! ```text
//! Start → CheckInvalid → CheckQueue → (MaybeQueued) → PreflightDecrement
//!       → AttemptLoop → Done
//! ```
//!
//! The pipeline suspends at exactly two points: while queued behind an
//! active throttle, and while sleeping between attempts. The gate's lock is
//! never held across either, so concurrent sends make independent progress.

use crate::{FailureReason, SendOutcome, Webhook};
use herald_rate_limit::{
    Admission, DEFAULT_RESET_AFTER_SECS, RateLimitSnapshot, parse_retry_after, wait_duration,
};
use herald_transport::{TransportRequest, TransportResponse};
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry2::strategy::ExponentialBackoff;
use tracing::{debug, warn};

pub(crate) async fn deliver(webhook: &Webhook, body: String) -> SendOutcome {
    // CheckInvalid: a dead handle never touches the network.
    if webhook.is_invalid() {
        warn!("Send refused: webhook handle is invalid");
        return SendOutcome::failed(FailureReason::InvalidWebhook, None);
    }

    // CheckQueue: suspend behind an active throttle, or fail fast when the
    // queue is full.
    match webhook.gate().admit().await {
        Admission::Open => {}
        Admission::Full => {
            warn!("Send refused: queue of suspended senders is full");
            return SendOutcome::failed(FailureReason::ExhaustedQueue, None);
        }
        Admission::Queued(released) => {
            debug!("Send suspended awaiting rate limit reset");
            // A closed channel means the queue was drained by invalidation;
            // either way the invalid flag decides what happens next.
            let _ = released.await;
            if webhook.is_invalid() {
                warn!("Queued send resumed on an invalidated handle");
                return SendOutcome::failed(FailureReason::InvalidWebhook, None);
            }
        }
    }

    // PreflightDecrement: spend a unit before the server can confirm it.
    webhook.gate().preflight().await;

    attempt_loop(webhook, body).await
}

/// Up to `max_attempts` transport calls, with exponential backoff on network
/// failures and header-driven waits on 429s.
async fn attempt_loop(webhook: &Webhook, body: String) -> SendOutcome {
    let config = *webhook.config();
    // Base 2 scaled by 500ms yields the 1s, 2s, 4s, ... schedule.
    let mut backoff = ExponentialBackoff::from_millis(2).factor(500);

    let mut failure: Option<FailureReason> = None;
    let mut last_response: Option<TransportResponse> = None;

    for attempt in 1..=config.max_attempts {
        let request = TransportRequest::post_json(webhook.url(), body.clone());

        let response = match webhook.transport().execute(request).await {
            Ok(response) => response,
            Err(err) if err.is_malformed() => {
                // The request never reached the server; the pre-emptive
                // decrement was wrong. Retrying a malformed request is
                // pointless.
                warn!(error = %err, "Malformed request; refunding budget");
                webhook.gate().refund().await;
                return SendOutcome::failed(FailureReason::BadRequest, None);
            }
            Err(err) => {
                warn!(attempt, error = %err, "Transport failure");
                // Sticky label: overwritten only by a later definitive
                // outcome.
                failure = Some(FailureReason::UnexpectedFailure);
                if attempt < config.max_attempts {
                    let delay = backoff.next().unwrap_or(Duration::from_secs(1));
                    debug!(?delay, attempt, "Backing off before retry");
                    sleep(delay).await;
                }
                continue;
            }
        };

        let snapshot = RateLimitSnapshot::from_headers(&response.headers);
        webhook.gate().observe(snapshot).await;

        let status = response.status;
        if status.is_success() {
            debug!(status = status.as_u16(), "Webhook delivered");
            return SendOutcome::delivered(response);
        }

        match status.as_u16() {
            400 => {
                warn!("Webhook rejected the payload as malformed");
                failure = Some(FailureReason::BadRequest);
                last_response = Some(response);
                break;
            }
            401 | 404 => {
                warn!(status = status.as_u16(), "Webhook credentials rejected");
                webhook.invalidate().await;
                failure = Some(FailureReason::InvalidWebhook);
                last_response = Some(response);
                break;
            }
            429 => {
                let retry_after =
                    parse_retry_after(&response.body).unwrap_or(DEFAULT_RESET_AFTER_SECS);
                webhook.gate().throttle(snapshot.reset_after).await;
                warn!(retry_after, attempt, "Webhook throttled");
                failure = Some(FailureReason::RateLimited);
                last_response = Some(response);
                if attempt < config.max_attempts {
                    let wait = wait_duration(retry_after) + config.safety_margin();
                    debug!(?wait, "Waiting out the throttle before retry");
                    sleep(wait).await;
                }
            }
            code => {
                // Unrecognized statuses terminate immediately; a retry has
                // no rule that would change the result.
                let message = if response.body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown status").to_string()
                } else {
                    response.body.clone()
                };
                warn!(status = code, message = %message, "Unexpected webhook status");
                failure = Some(FailureReason::Http {
                    status: code,
                    message,
                });
                last_response = Some(response);
                break;
            }
        }
    }

    SendOutcome::failed(
        failure.unwrap_or(FailureReason::UnexpectedFailure),
        last_response,
    )
}
