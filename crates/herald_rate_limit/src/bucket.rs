//! The per-endpoint budget counter.

use crate::RateLimitSnapshot;
use tracing::debug;

/// Mutable rate limit record for one endpoint.
///
/// `remaining` is a conservative lower bound on the server's view of the
/// bucket: the pipeline decrements it before each attempt, and header
/// observations only ever lower it further. The counter never exceeds the
/// bucket limit.
///
/// # Example
///
/// ```
/// use herald_rate_limit::RateLimitState;
///
/// let mut state = RateLimitState::new(5);
/// state.preflight();
/// assert_eq!(state.remaining(), 4);
/// assert!(!state.is_limited());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitState {
    remaining: u32,
    limited: bool,
    reset_epoch: Option<f64>,
    limit: u32,
}

impl RateLimitState {
    /// Create a fresh state with a full bucket.
    pub fn new(limit: u32) -> Self {
        Self {
            remaining: limit,
            limited: false,
            reset_epoch: None,
            limit,
        }
    }

    /// Requests believed to remain in the current window.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether new sends must suspend until the next reset.
    pub fn is_limited(&self) -> bool {
        self.limited
    }

    /// Last server-reported reset time, epoch seconds. Informational only;
    /// the scheduled reset task is what gates release.
    pub fn reset_epoch(&self) -> Option<f64> {
        self.reset_epoch
    }

    /// The configured bucket limit.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Spend one unit before an attempt.
    ///
    /// Dropping to zero marks the endpoint limited speculatively, ahead of
    /// server feedback, so bursts cannot overrun the bucket.
    pub fn preflight(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            debug!("Local budget exhausted; marking rate limited");
            self.limited = true;
        }
    }

    /// Fold one response's headers into the local record.
    ///
    /// The server value is authoritative only when lower than the local
    /// counter; pre-emptive decrements must never be undone by a stale
    /// header. A server-reported zero marks the endpoint limited.
    pub fn observe(&mut self, snapshot: &RateLimitSnapshot) {
        if let Some(remaining) = snapshot.remaining {
            if remaining < self.remaining {
                debug!(
                    local = self.remaining,
                    server = remaining,
                    "Lowering budget from server headers"
                );
                self.remaining = remaining;
            }
            if remaining == 0 {
                self.limited = true;
            }
        }
        if let Some(reset) = snapshot.reset {
            self.reset_epoch = Some(reset);
        }
    }

    /// Return one unit spent on a request that never reached the server.
    ///
    /// Capped at the bucket limit.
    pub fn refund(&mut self) {
        self.remaining = (self.remaining + 1).min(self.limit);
        debug!(remaining = self.remaining, "Refunded one budget unit");
    }

    /// Restore the full bucket and clear the throttle. Called by the reset
    /// task when the window rolls over.
    pub fn refill(&mut self) {
        self.remaining = self.limit;
        self.limited = false;
    }

    /// Mark the endpoint limited (server reported exhaustion via 429).
    pub fn throttle(&mut self) {
        self.limited = true;
    }
}
