//! The serialization gate: one mutual-exclusion region around the storage
//! handle.
//!
//! Every storage primitive runs as `gate.run(op, |conn| ...)`. Callers are
//! suspended only while waiting to enter; waiters are served in FIFO order
//! (`tokio::sync::Mutex` is fair), so no caller starves. The closure runs
//! synchronously while the gate is held and the gate is released when the
//! guard drops, on success, error and panic alike.
//!
//! There is no timeout and no cancellation once a caller is inside the gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::trace;

/// Serializes access to a shared resource `T`.
#[derive(Debug)]
pub struct Gate<T> {
    inner: Mutex<T>,
    acquisitions: AtomicU64,
}

impl<T> Gate<T> {
    /// Wrap `resource` in a gate.
    pub fn new(resource: T) -> Self {
        Self {
            inner: Mutex::new(resource),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Wait for the gate, then run `f` with exclusive access.
    ///
    /// `op` names the operation in trace output.
    pub async fn run<R>(&self, op: &'static str, f: impl FnOnce(&mut T) -> R) -> R {
        let waited = Instant::now();
        let mut guard = self.inner.lock().await;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        trace!(op, wait_us = waited.elapsed().as_micros(), "Gate acquired");
        f(&mut guard)
    }

    /// Total number of times the gate has been entered.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Consume the gate and return the resource.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
