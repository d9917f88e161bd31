//! Named lock registry
//!
//! Two locks are in play. The registry map is guarded by a short-lived
//! `std::sync::Mutex` that is only held for a lookup or insert and never
//! across an `.await`. Each key owns a `tokio::sync::Mutex` that the caller
//! holds for the whole critical section, network round trips included.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::{Mutex as KeyMutex, OwnedMutexGuard};

type KeyLock = Arc<KeyMutex<()>>;

/// Registry of per-name mutual exclusion locks.
///
/// Entries are created on first use and kept for the lifetime of the
/// registry. The registry is an ordinary value: construct one per provider
/// process and share it as `Arc<NamedLocks>`.
#[derive(Debug, Default)]
pub struct NamedLocks {
    locks: Mutex<HashMap<String, KeyLock>>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock backing `key`.
    fn get(&self, key: &str) -> KeyLock {
        // The map is only mutated by inserts, so a panic elsewhere cannot
        // leave it half-updated.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(key) {
            return Arc::clone(lock);
        }

        tracing::trace!(key, "Registering named lock");
        let lock = Arc::new(KeyMutex::new(()));
        locks.insert(key.to_string(), Arc::clone(&lock));
        lock
    }

    /// Wait until the caller exclusively holds `key`.
    ///
    /// The key is released when the returned guard is dropped or
    /// [`NamedLockGuard::unlock`] is called.
    pub async fn lock(&self, key: &str) -> NamedLockGuard {
        let lock = self.get(key);

        let guard = match Arc::clone(&lock).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(key, "Waiting for named lock");
                let started = Instant::now();
                let guard = lock.lock_owned().await;
                tracing::debug!(
                    key,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Acquired contended named lock"
                );
                guard
            }
        };

        tracing::trace!(key, "Acquired named lock");
        NamedLockGuard::new(key, guard)
    }

    /// Blocking variant of [`lock`](Self::lock) for plain OS threads.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an asynchronous execution context.
    pub fn blocking_lock(&self, key: &str) -> NamedLockGuard {
        let guard = self.get(key).blocking_lock_owned();
        tracing::trace!(key, "Acquired named lock (blocking)");
        NamedLockGuard::new(key, guard)
    }

    /// Acquire `key` only if nobody holds it right now.
    pub fn try_lock(&self, key: &str) -> Option<NamedLockGuard> {
        self.get(key)
            .try_lock_owned()
            .ok()
            .map(|guard| NamedLockGuard::new(key, guard))
    }

    /// Acquire every key in `keys`.
    ///
    /// Keys are sorted and deduplicated first, so every caller acquires
    /// overlapping key sets in the same order and no circular wait can form.
    /// Dropping the future part-way releases whatever was already acquired.
    pub async fn lock_all<I, K>(&self, keys: I) -> MultiLockGuard
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut ordered: Vec<String> = keys
            .into_iter()
            .map(|key| key.as_ref().to_string())
            .collect();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in &ordered {
            guards.push(self.lock(key).await);
        }

        MultiLockGuard { guards }
    }

    /// Number of distinct keys seen so far
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one named lock.
#[derive(Debug)]
#[must_use = "the named lock is released as soon as the guard is dropped"]
pub struct NamedLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl NamedLockGuard {
    fn new(key: &str, guard: OwnedMutexGuard<()>) -> Self {
        Self {
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// The key this guard holds
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the key now instead of at end of scope.
    pub fn unlock(self) {
        drop(self);
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        tracing::trace!(key = %self.key, "Released named lock");
    }
}

/// Exclusive hold on a set of named locks, released in reverse order.
#[derive(Debug)]
#[must_use = "the named locks are released as soon as the guard is dropped"]
pub struct MultiLockGuard {
    guards: Vec<NamedLockGuard>,
}

impl MultiLockGuard {
    /// Held keys, in acquisition order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.guards.iter().map(NamedLockGuard::key)
    }

    /// Release every key now instead of at end of scope.
    pub fn unlock(self) {
        drop(self);
    }
}

impl Drop for MultiLockGuard {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}
