//! Keyed async mutual exclusion.
//!
//! `KeyedLocks` hands out one async mutex per key. Holders of different keys
//! never contend; holders of the same key are serialized in FIFO order.
//! Entries are created on first use and removed when the last guard for the
//! key is released, so the table only ever holds keys that are locked or
//! being waited on.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Entries<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// Table of per-key async locks.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    entries: Entries<K>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`.
    ///
    /// The lock is held until the returned guard is dropped.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let mutex = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        let guard = mutex.lock_owned().await;

        KeyedGuard {
            key,
            entries: Arc::clone(&self.entries),
            guard: Some(guard),
        }
    }

    /// Number of keys currently locked or awaited.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive ownership of one key. Released on drop.
#[derive(Debug)]
pub struct KeyedGuard<K>
where
    K: Eq + Hash,
{
    key: K,
    entries: Entries<K>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> KeyedGuard<K>
where
    K: Eq + Hash,
{
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K> Drop for KeyedGuard<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        // Release the async mutex before inspecting the table so the
        // strong count only reflects the table entry and any waiters.
        drop(self.guard.take());

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(mutex) = entries.get(&self.key) {
            if Arc::strong_count(mutex) == 1 {
                entries.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks: KeyedLocks<String> = KeyedLocks::new();

        let guard = locks.lock("alice".to_string()).await;
        assert_eq!(locks.len(), 1);
        assert_eq!(guard.key(), "alice");

        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let locks: KeyedLocks<u32> = KeyedLocks::new();

        let first = locks.lock(1).await;
        let second = tokio::time::timeout(Duration::from_millis(200), locks.lock(2))
            .await
            .expect("distinct key should lock immediately");

        assert_eq!(locks.len(), 2);
        drop(first);
        drop(second);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_blocks_until_released() {
        let locks: KeyedLocks<u32> = KeyedLocks::new();

        let held = locks.lock(7).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock(7)).await;
        assert!(blocked.is_err(), "second lock on the same key must wait");

        drop(held);
        let reacquired = tokio::time::timeout(Duration::from_millis(200), locks.lock(7))
            .await
            .expect("lock should be free after release");
        drop(reacquired);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_waiters_remain() {
        let locks = Arc::new(KeyedLocks::<u32>::new());

        let held = locks.lock(3).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(3).await;
            })
        };

        // Give the waiter time to register on the key.
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert!(locks.len() <= 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_mutually_exclusive() {
        let locks = Arc::new(KeyedLocks::<&'static str>::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("room").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
