//! TTL-bounded cache fronting task reads.
//!
//! Hand-rolled over a mutex-guarded `HashMap`, matching the synchronization
//! idiom already used by [`super::task_store::InMemoryTaskStore`] and
//! [`super::event_queue::InMemoryQueueManager`]. Evicts the entry with the
//! oldest insertion timestamp when the cache is at capacity and a new key
//! arrives.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Default maximum number of entries held by a [`TtlCache`].
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Default time-to-live for cached entries, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A small mutex-guarded cache with a fixed capacity and per-entry TTL.
///
/// Reads past the TTL are treated as misses. Writes past capacity evict the
/// single oldest entry (by insertion time) to make room.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    capacity: usize,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    /// Create a cache using the crate defaults (1000 entries, 300s TTL).
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CACHE_SIZE, Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    /// Look up a key. Returns `None` on a miss or an expired entry (the
    /// expired entry is removed).
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(e) => e.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    /// Insert or overwrite a key's value, evicting the oldest entry first if
    /// the cache is full and the key is new.
    pub async fn put(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove a key from the cache, if present.
    pub async fn invalidate(&self, key: &K) {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
    }

    /// Number of entries currently held (including any not-yet-swept expired
    /// ones).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
