//! Bounded FIFO of suspended senders.

use std::collections::VecDeque;
use tokio::sync::oneshot;
use tracing::debug;

/// Backpressure gate for throttled endpoints.
///
/// Each waiter is the sending half of a oneshot channel; the suspended caller
/// awaits the receiving half. Release wakes waiters in arrival order. Enqueue
/// is refused once the queue holds `capacity` waiters, so the caller can fail
/// fast instead of piling up unbounded work.
#[derive(Debug)]
pub struct SendQueue {
    waiters: VecDeque<oneshot::Sender<()>>,
    capacity: usize,
}

impl SendQueue {
    /// Create an empty queue with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            waiters: VecDeque::new(),
            capacity,
        }
    }

    /// Number of suspended senders.
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Whether the queue holds no waiters.
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// The configured maximum number of waiters.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a waiter and hand back the receiver the caller should await.
    ///
    /// Returns `None` when the queue is full; the queue is left untouched in
    /// that case.
    pub fn try_enqueue(&mut self) -> Option<oneshot::Receiver<()>> {
        if self.waiters.len() >= self.capacity {
            debug!(len = self.waiters.len(), "Send queue full; rejecting");
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.waiters.push_back(tx);
        Some(rx)
    }

    /// Wake up to `max` waiters in FIFO order. Returns the number woken.
    ///
    /// Waiters whose receiver is already gone are skipped without counting
    /// against `max`'s purpose; each popped entry is one release slot spent.
    pub fn release(&mut self, max: usize) -> usize {
        let mut released = 0;
        for _ in 0..max {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.send(()).is_ok() {
                released += 1;
            }
        }
        debug!(released, queued = self.waiters.len(), "Released queued senders");
        released
    }

    /// Drop every waiter, waking all suspended callers with a closed channel.
    ///
    /// Used when the handle is invalidated: resumed callers re-check the
    /// invalid flag and fail instead of sending.
    pub fn drain(&mut self) -> usize {
        let drained = self.waiters.len();
        self.waiters.clear();
        drained
    }
}
