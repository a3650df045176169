// Per-key lock table
//
// Mutations on one account key run one at a time. Entries are created on
// demand and dropped again once nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Table = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

#[derive(Default)]
pub(crate) struct KeyLocks {
    table: Table,
}

/// Held while a key is being mutated
pub(crate) struct KeyGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    table: Table,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub(crate) async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = mutex.lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            guard: Some(guard),
            table: self.table.clone(),
        }
    }

    /// Lock two keys in a fixed order. Returns one guard when they are equal.
    pub(crate) async fn lock_pair(&self, a: &str, b: &str) -> (KeyGuard, Option<KeyGuard>) {
        if a == b {
            return (self.lock(a).await, None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first).await;
        let second = self.lock(second).await;
        (first, Some(second))
    }

    /// Number of keys with a live lock entry
    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mutex) = table.get(&self.key) {
            // Only the table's own reference is left
            if Arc::strong_count(mutex) == 1 {
                table.remove(&self.key);
            }
        }
    }
}
