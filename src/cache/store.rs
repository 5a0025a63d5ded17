//! Cache storage backends.
//!
//! `CacheStore` is the injected key/value interface the read path talks to.
//! The in-memory implementation ships as the default; anything that can get,
//! set with a TTL, and remove by prefix can be slotted in behind the trait.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use thiserror::Error;

use super::lock::{rw_read, rw_write};

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache backend does not support `{0}`")]
    Unsupported(&'static str),
}

/// Key/value store with per-entry TTL.
///
/// An entry past its TTL is treated as absent; implementations never return
/// expired values.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheStoreError>;

    /// Store a value. The TTL is measured from the moment of storage.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheStoreError>;

    async fn remove(&self, key: &str) -> Result<(), CacheStoreError>;

    /// Remove all entries whose key starts with `prefix`. Returns the number
    /// of entries removed. Backends that cannot enumerate keys return
    /// `CacheStoreError::Unsupported`; callers then rely on TTL expiry.
    async fn remove_prefix(&self, prefix: &str) -> Result<u64, CacheStoreError>;
}

struct StoredEntry {
    value: Bytes,
    stored_at: Instant,
    ttl: Duration,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

/// Bounded in-memory cache store with LRU eviction.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, StoredEntry>>,
}

impl MemoryCacheStore {
    pub fn new(entry_limit: usize) -> Self {
        let capacity = NonZeroUsize::new(entry_limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Number of live (stored, possibly expired) entries.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheStoreError> {
        let mut entries = rw_write(&self.entries, "get");
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.pop(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheStoreError> {
        let entry = StoredEntry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        let evicted = rw_write(&self.entries, "set").push(key.to_string(), entry);
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                metrics::counter!("vitrine_cache_evict_total").increment(1);
            }
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheStoreError> {
        rw_write(&self.entries, "remove").pop(key);
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<u64, CacheStoreError> {
        let mut entries = rw_write(&self.entries, "remove_prefix");
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &matching {
            entries.pop(key);
        }

        Ok(matching.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrip() {
        let store = MemoryCacheStore::new(16);

        store
            .set("projects:list", Bytes::from("payload"), Duration::from_secs(60))
            .await
            .unwrap();

        let value = store.get("projects:list").await.unwrap();
        assert_eq!(value, Some(Bytes::from("payload")));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryCacheStore::new(16);

        store
            .set("k", Bytes::from("v"), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        // the expired entry was dropped, not merely hidden
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn remove_prefix_clears_matching_entries_only() {
        let store = MemoryCacheStore::new(16);
        let ttl = Duration::from_secs(60);

        store.set("projects:list", Bytes::from("a"), ttl).await.unwrap();
        store.set("projects:detail:1", Bytes::from("b"), ttl).await.unwrap();
        store.set("posts:list", Bytes::from("c"), ttl).await.unwrap();

        let removed = store.remove_prefix("projects").await.unwrap();
        assert_eq!(removed, 2);

        assert_eq!(store.get("projects:list").await.unwrap(), None);
        assert_eq!(store.get("projects:detail:1").await.unwrap(), None);
        assert_eq!(store.get("posts:list").await.unwrap(), Some(Bytes::from("c")));
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let store = MemoryCacheStore::new(2);
        let ttl = Duration::from_secs(60);

        store.set("a", Bytes::from("1"), ttl).await.unwrap();
        store.set("b", Bytes::from("2"), ttl).await.unwrap();
        store.set("c", Bytes::from("3"), ttl).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), Some(Bytes::from("2")));
        assert_eq!(store.get("c").await.unwrap(), Some(Bytes::from("3")));
    }

    #[tokio::test]
    async fn overwriting_restarts_the_ttl_clock() {
        let store = MemoryCacheStore::new(16);

        store
            .set("k", Bytes::from("old"), Duration::from_millis(10))
            .await
            .unwrap();
        store
            .set("k", Bytes::from("new"), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        assert_eq!(store.get("k").await.unwrap(), Some(Bytes::from("new")));
    }
}
