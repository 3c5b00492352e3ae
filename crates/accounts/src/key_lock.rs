//! Per-key concurrency control.
//!
//! Only one metered request runs per API key at a time.  Concurrent
//! requests on the same key queue behind the holder; different keys never
//! contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{AccountError, Result};

/// Each key maps to a `Semaphore(1)`; the permit is held from lookup until
/// usage has been recorded and released on drop.
pub struct KeyLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for KeyLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> Result<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned()
            .await
            .map_err(|_| AccountError::Storage("key lock closed".into()))
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }

    /// Drop locks nobody holds or waits on.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1 || sem.available_permits() == 0);
    }
}
