//! Exclusive access gate over physical lines.
//!
//! One async mutex per unique line identifier, held for exactly one
//! transaction (or one deliberate write+confirm sequence). The registry is
//! created once at startup, injected into every controller, and torn down
//! with the application; nothing else in the process may serialize line
//! access on its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::Mutex;

/// Registry of per-line mutual-exclusion locks.
///
/// Lines are opaque identifiers; a lock is created lazily on first use and
/// lives for the registry's lifetime. Transactions on the same line are
/// totally ordered by lock acquisition; transactions on different lines are
/// free to run concurrently.
#[derive(Default)]
pub struct LineRegistry {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LineRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `line`, created on first request.
    ///
    /// Callers hold the returned lock across an entire transaction sequence;
    /// the registry's own map lock is only held for this lookup.
    pub fn lock_for(&self, line: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(line.to_string())
            .or_default()
            .clone()
    }

    /// Number of distinct lines seen so far.
    pub fn line_count(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run `op` while holding the exclusive lock for `line`.
    ///
    /// The lock is released on every exit path, including cancellation, by
    /// guard drop. `op`'s result is returned unchanged.
    pub async fn with_line<F, Fut, R>(&self, line: &str, op: F) -> R
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = R>,
    {
        let lock = self.lock_for(line);
        let _guard = lock.lock().await;
        op().await
    }
}
