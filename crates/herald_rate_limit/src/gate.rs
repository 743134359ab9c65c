//! The per-endpoint gate: budget, queue, and reset task under one lock.

use crate::{DispatchConfig, RateLimitSnapshot, RateLimitState, SendQueue};
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// Shared mutable record guarded by the gate's mutex.
#[derive(Debug)]
struct GateInner {
    state: RateLimitState,
    queue: SendQueue,
    /// At most one live reset task per endpoint.
    reset_task: Option<JoinHandle<()>>,
}

/// Result of asking the gate whether a send may proceed.
#[derive(Debug)]
pub enum Admission {
    /// Not throttled; proceed to the attempt loop.
    Open,
    /// Throttled; await the receiver, then re-check invalidation.
    Queued(oneshot::Receiver<()>),
    /// Throttled and the queue is full; fail fast.
    Full,
}

/// Rate limit gate for one webhook endpoint.
///
/// Combines the budget counter, the FIFO of suspended senders, and the
/// deferred reset task behind a single async mutex. The lock is only ever
/// held across in-memory mutations, never across a network call or sleep,
/// so concurrent sends against the same endpoint serialize their state
/// updates without blocking each other's I/O.
///
/// Cloning the gate shares the underlying state; each webhook handle owns
/// exactly one logical gate.
#[derive(Debug, Clone)]
pub struct RateGate {
    inner: Arc<Mutex<GateInner>>,
    config: DispatchConfig,
}

impl RateGate {
    /// Create a gate with a full bucket and an empty queue.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GateInner {
                state: RateLimitState::new(config.bucket_limit),
                queue: SendQueue::new(config.queue_max),
                reset_task: None,
            })),
            config,
        }
    }

    /// The configuration this gate was built with.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Decide whether a send may proceed right now.
    ///
    /// Open when not throttled. When throttled, the caller is appended to
    /// the queue and must await the returned receiver; a full queue is
    /// reported immediately without mutating queue state.
    #[instrument(skip(self))]
    pub async fn admit(&self) -> Admission {
        let mut guard = self.inner.lock().await;
        if !guard.state.is_limited() {
            return Admission::Open;
        }
        match guard.queue.try_enqueue() {
            Some(rx) => {
                debug!(queued = guard.queue.len(), "Send suspended awaiting reset");
                Admission::Queued(rx)
            }
            None => Admission::Full,
        }
    }

    /// Spend one budget unit ahead of an attempt.
    pub async fn preflight(&self) {
        self.inner.lock().await.state.preflight();
    }

    /// Fold one response's rate limit headers into the gate.
    ///
    /// When the server reports an exhausted window, a reset task is
    /// scheduled from the header's reset-after value so queued senders are
    /// guaranteed a wake-up even if no 429 ever arrives.
    #[instrument(skip(self))]
    pub async fn observe(&self, snapshot: RateLimitSnapshot) {
        let mut guard = self.inner.lock().await;
        guard.state.observe(&snapshot);
        if snapshot.remaining == Some(0) {
            self.ensure_reset_scheduled(&mut guard, snapshot.reset_after);
        }
    }

    /// Mark the endpoint throttled (a 429 arrived) and make sure a reset
    /// task is pending.
    #[instrument(skip(self))]
    pub async fn throttle(&self, reset_after: Option<f64>) {
        let mut guard = self.inner.lock().await;
        guard.state.throttle();
        self.ensure_reset_scheduled(&mut guard, reset_after);
    }

    /// Return one unit spent on a request that never reached the server.
    pub async fn refund(&self) {
        self.inner.lock().await.state.refund();
    }

    /// Wake every queued sender with a closed channel.
    ///
    /// Called on handle invalidation; resumed callers re-check the invalid
    /// flag before doing anything else.
    #[instrument(skip(self))]
    pub async fn drain_waiters(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let drained = guard.queue.drain();
        debug!(drained, "Drained send queue");
        drained
    }

    /// Requests believed to remain in the current window.
    pub async fn remaining(&self) -> u32 {
        self.inner.lock().await.state.remaining()
    }

    /// Whether new sends must currently suspend.
    pub async fn is_limited(&self) -> bool {
        self.inner.lock().await.state.is_limited()
    }

    /// Number of senders suspended in the queue.
    pub async fn queue_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    /// Schedule the deferred reset unless one is already pending.
    ///
    /// Fires after the server-reported reset-after (default 1s) plus the
    /// safety margin. On fire: refill the bucket, clear the throttle, clear
    /// the task slot, and release up to one bucket's worth of queued
    /// senders in FIFO order.
    fn ensure_reset_scheduled(&self, guard: &mut GateInner, reset_after: Option<f64>) {
        if guard
            .reset_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
        {
            return;
        }

        let reset_after = reset_after.unwrap_or(crate::DEFAULT_RESET_AFTER_SECS);
        let delay = crate::wait_duration(reset_after) + self.config.safety_margin();
        let inner = Arc::clone(&self.inner);
        let bucket_limit = self.config.bucket_limit as usize;

        debug!(?delay, "Scheduling rate limit reset");
        guard.reset_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut guard = inner.lock().await;
            guard.state.refill();
            guard.reset_task = None;
            let released = guard.queue.release(bucket_limit);
            debug!(released, "Rate limit window reset");
        }));
    }
}
