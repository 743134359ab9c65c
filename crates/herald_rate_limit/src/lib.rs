//! Per-endpoint rate limit state machine for the Herald webhook dispatcher.
//!
//! Discord-style webhook endpoints advertise a leaky-bucket budget through
//! response headers (`x-ratelimit-remaining`, `x-ratelimit-reset`,
//! `x-ratelimit-reset-after`). This crate models that contract:
//!
//! - [`RateLimitState`] tracks the remaining budget for one endpoint. Local
//!   pre-emptive decrements keep a conservative lower bound between responses;
//!   server-reported values only ever lower the local counter.
//! - [`SendQueue`] is a bounded FIFO of suspended senders waiting for the
//!   throttle to clear.
//! - [`RateGate`] composes both behind a per-endpoint mutex and owns the
//!   deferred reset task that refills the bucket and releases queued senders.
//!
//! Configuration constants load from TOML via [`HeraldConfig`], with bundled
//! defaults and optional user overrides.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod config;
mod gate;
mod headers;
mod queue;

pub use bucket::RateLimitState;
pub use config::{DispatchConfig, HeraldConfig};
pub use gate::{Admission, RateGate};
pub use headers::{
    DEFAULT_RESET_AFTER_SECS, MAX_WAIT_SECS, RATELIMIT_REMAINING, RATELIMIT_RESET,
    RATELIMIT_RESET_AFTER, RateLimitSnapshot, parse_retry_after, wait_duration,
};
pub use queue::SendQueue;
