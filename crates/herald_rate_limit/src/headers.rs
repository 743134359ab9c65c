//! Rate limit header and body parsing.
//!
//! Webhook endpoints report their leaky-bucket state through response headers
//! on every request, and through a JSON `retry_after` field on 429 bodies.
//! [`RateLimitSnapshot`] captures the header values from one response so the
//! rest of the crate never touches a `HeaderMap` directly.

use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Requests remaining in the current window.
pub const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Epoch seconds at which the window resets.
pub const RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Seconds until the window resets.
pub const RATELIMIT_RESET_AFTER: &str = "x-ratelimit-reset-after";

/// Fallback when the server omits reset/retry timing.
pub const DEFAULT_RESET_AFTER_SECS: f64 = 1.0;

/// Upper bound on any server-supplied wait, in seconds.
pub const MAX_WAIT_SECS: f64 = 3600.0;

/// Convert server-reported seconds into a wait duration.
///
/// Header and body values come off the wire and cannot be trusted: NaN,
/// infinities, negatives, and absurdly large numbers all parse as valid
/// `f64`s but would panic `Duration::from_secs_f64` or stall the pipeline.
/// Non-finite input falls back to [`DEFAULT_RESET_AFTER_SECS`]; finite input
/// is clamped to `0.0..=MAX_WAIT_SECS`.
///
/// # Example
///
/// ```
/// use herald_rate_limit::wait_duration;
/// use std::time::Duration;
///
/// assert_eq!(wait_duration(2.0), Duration::from_secs(2));
/// assert_eq!(wait_duration(f64::INFINITY), Duration::from_secs(1));
/// assert_eq!(wait_duration(-5.0), Duration::ZERO);
/// ```
pub fn wait_duration(secs: f64) -> Duration {
    if !secs.is_finite() {
        warn!(secs, "Non-finite wait from server; using default");
        return Duration::from_secs_f64(DEFAULT_RESET_AFTER_SECS);
    }
    if secs > MAX_WAIT_SECS {
        warn!(secs, "Oversized wait from server; clamping");
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_WAIT_SECS))
}

/// Rate limit values extracted from one response's headers.
///
/// All fields are optional; endpoints behind proxies sometimes strip the
/// headers entirely.
///
/// # Example
///
/// ```
/// use herald_rate_limit::RateLimitSnapshot;
/// use reqwest::header::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-ratelimit-remaining", "4".parse().unwrap());
/// headers.insert("x-ratelimit-reset-after", "1.58".parse().unwrap());
///
/// let snapshot = RateLimitSnapshot::from_headers(&headers);
/// assert_eq!(snapshot.remaining, Some(4));
/// assert_eq!(snapshot.reset_after, Some(1.58));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateLimitSnapshot {
    /// Server-reported requests remaining in the window.
    pub remaining: Option<u32>,
    /// Server-reported reset time, epoch seconds.
    pub reset: Option<f64>,
    /// Server-reported seconds until reset.
    pub reset_after: Option<f64>,
}

impl RateLimitSnapshot {
    /// Extract rate limit values from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let snapshot = Self {
            remaining: parse_header(headers, RATELIMIT_REMAINING),
            reset: parse_header(headers, RATELIMIT_RESET),
            reset_after: parse_header(headers, RATELIMIT_RESET_AFTER),
        };
        debug!(?snapshot, "Parsed rate limit headers");
        snapshot
    }

    /// Seconds until reset, defaulting when the header was absent.
    pub fn reset_after_or_default(&self) -> f64 {
        self.reset_after.unwrap_or(DEFAULT_RESET_AFTER_SECS)
    }
}

/// 429 response body shape.
#[derive(Debug, Deserialize)]
struct RetryAfterBody {
    retry_after: f64,
}

/// Parse the `retry_after` field (seconds) from a 429 response body.
///
/// Returns `None` when the body is not JSON or lacks the field; callers fall
/// back to [`DEFAULT_RESET_AFTER_SECS`].
///
/// # Example
///
/// ```
/// use herald_rate_limit::parse_retry_after;
///
/// assert_eq!(parse_retry_after(r#"{"retry_after": 1.2}"#), Some(1.2));
/// assert_eq!(parse_retry_after("not json"), None);
/// ```
pub fn parse_retry_after(body: &str) -> Option<f64> {
    serde_json::from_str::<RetryAfterBody>(body)
        .ok()
        .map(|b| b.retry_after)
}

/// Helper to parse a typed value from a header.
fn parse_header<T: FromStr>(headers: &HeaderMap, key: &str) -> Option<T> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}
