//! Per-key async mutual exclusion.
//!
//! The webhook reconciler serializes event application per subscription:
//! events for different subscriptions proceed concurrently, while two
//! deliveries touching the same subscription queue behind one another.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A map of named async locks.
///
/// Locks are created on first use and kept for the life of the process; the
/// key space (live subscription ids under concurrent delivery) stays small.
#[derive(Default)]
pub struct KeyedLock {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, waiting if another holder is active.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
