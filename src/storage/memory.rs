// In-memory LedgerStore
// Used by tests and ephemeral runs; supports delay and failure injection

use super::store::{LedgerStore, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Non-durable store held in a map
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    delay_ms: u64,
    /// Puts allowed before every further put fails; `usize::MAX` means never fail
    puts_before_failure: AtomicUsize,
    put_count: AtomicUsize,
    flush_failures: AtomicUsize,
    unavailable: AtomicBool,
    atomic: bool,
}

impl MemoryStore {
    /// Create an empty store that never fails
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            delay_ms: 0,
            puts_before_failure: AtomicUsize::new(usize::MAX),
            put_count: AtomicUsize::new(0),
            flush_failures: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            atomic: false,
        }
    }

    /// Apply `put_batch` all-or-nothing under one write lock
    pub fn with_atomic_batches(mut self) -> Self {
        self.atomic = true;
        self
    }

    /// Sleep before answering every call
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Let the next `n` puts succeed, then fail every put after that
    pub fn fail_puts_after(&self, n: usize) {
        let done = self.put_count.load(Ordering::SeqCst);
        self.puts_before_failure
            .store(done.saturating_add(n), Ordering::SeqCst);
    }

    /// Fail the next `n` flushes. Puts still land.
    pub fn fail_next_flushes(&self, n: usize) {
        self.flush_failures.store(n, Ordering::SeqCst);
    }

    /// Fail every call until `recover` is called
    pub fn fail_all(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    /// Clear all injected failures
    pub fn recover(&self) {
        self.unavailable.store(false, Ordering::SeqCst);
        self.puts_before_failure.store(usize::MAX, Ordering::SeqCst);
        self.flush_failures.store(0, Ordering::SeqCst);
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of every key, in order
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    async fn before_call(&self) -> Result<(), StoreError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.before_call().await?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.before_call().await?;
        let call_num = self.put_count.fetch_add(1, Ordering::SeqCst);
        if call_num >= self.puts_before_failure.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("put #{} rejected", call_num)));
        }
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn put_batch(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        if !self.atomic {
            for (key, value) in entries {
                self.put(&key, value).await?;
            }
            return Ok(());
        }

        self.before_call().await?;
        let call_num = self.put_count.fetch_add(1, Ordering::SeqCst);
        if call_num >= self.puts_before_failure.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("batch #{} rejected", call_num)));
        }
        let mut map = self.entries.write().await;
        for (key, value) in entries {
            map.insert(key, value);
        }
        Ok(())
    }

    fn atomic_batches(&self) -> bool {
        self.atomic
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.before_call().await?;
        let remaining = self.flush_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.flush_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::FlushFailed("injected flush failure".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.before_call().await?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.before_call().await?;
        self.entries.write().await.clear();
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        self.before_call().await?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}
