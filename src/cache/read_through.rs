//! Read-through caching around expensive lookups.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::store::CacheStore;

const TARGET: &str = "vitrine::cache";

/// Wraps a `CacheStore` with get-or-compute-and-store semantics.
///
/// A cache outage is a degradation, not a failure: when the store cannot be
/// read or written, the compute function runs and its result is returned
/// directly. Concurrent misses on the same key may each invoke the compute
/// function; compute functions are bounded and idempotent, so the duplicate
/// work is an accepted trade-off.
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn CacheStore> {
        self.store.clone()
    }

    /// Return the cached value for `key` if present and fresh; otherwise run
    /// `compute`, store its result with `ttl`, and return it.
    ///
    /// Only `compute` errors propagate. Store errors are logged and absorbed.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_slice(&raw) {
                Ok(value) => {
                    metrics::counter!("vitrine_cache_hit_total").increment(1);
                    return Ok(value);
                }
                Err(err) => {
                    // Treat undecodable payloads as a miss and overwrite below.
                    warn!(
                        target: TARGET,
                        key,
                        error = %err,
                        "cached payload failed to decode, recomputing"
                    );
                }
            },
            Ok(None) => {}
            Err(err) => {
                warn!(
                    target: TARGET,
                    key,
                    error = %err,
                    "cache read failed, computing directly"
                );
                metrics::counter!("vitrine_cache_degraded_total").increment(1);
                return compute().await;
            }
        }

        metrics::counter!("vitrine_cache_miss_total").increment(1);
        let value = compute().await?;

        match serde_json::to_vec(&value) {
            Ok(raw) => {
                if let Err(err) = self.store.set(key, raw.into(), ttl).await {
                    warn!(
                        target: TARGET,
                        key,
                        error = %err,
                        "cache write failed, serving computed value"
                    );
                }
            }
            Err(err) => {
                warn!(
                    target: TARGET,
                    key,
                    error = %err,
                    "computed value is not serializable, skipping cache write"
                );
            }
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::super::store::{CacheStoreError, MemoryCacheStore};
    use super::*;

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheStoreError> {
            Err(CacheStoreError::Unavailable("connection refused".into()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: Bytes,
            _ttl: Duration,
        ) -> Result<(), CacheStoreError> {
            Err(CacheStoreError::Unavailable("connection refused".into()))
        }

        async fn remove(&self, _key: &str) -> Result<(), CacheStoreError> {
            Err(CacheStoreError::Unavailable("connection refused".into()))
        }

        async fn remove_prefix(&self, _prefix: &str) -> Result<u64, CacheStoreError> {
            Err(CacheStoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn second_read_within_ttl_skips_compute() {
        let cache = ReadThroughCache::new(Arc::new(MemoryCacheStore::new(16)));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: u32 = cache
                .get_or_compute("k", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let cache = ReadThroughCache::new(Arc::new(MemoryCacheStore::new(16)));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let _: u32 = cache
                .get_or_compute("k", Duration::from_millis(10), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(7)
                })
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broken_store_degrades_to_direct_compute() {
        let cache = ReadThroughCache::new(Arc::new(BrokenStore));

        let value: u32 = cache
            .get_or_compute("k", Duration::from_secs(60), || async {
                Ok::<_, Infallible>(42)
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn concurrent_misses_all_observe_the_computed_value() {
        // Simultaneous misses may each run the compute function; every caller
        // still gets a correct value.
        let cache = Arc::new(ReadThroughCache::new(Arc::new(MemoryCacheStore::new(16))));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("k", Duration::from_secs(60), || async {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok::<_, Infallible>(7u32)
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
    }

    #[tokio::test]
    async fn compute_errors_propagate() {
        let cache = ReadThroughCache::new(Arc::new(MemoryCacheStore::new(16)));

        let result: Result<u32, &str> = cache
            .get_or_compute("k", Duration::from_secs(60), || async { Err("repo down") })
            .await;

        assert_eq!(result, Err("repo down"));
    }

    #[tokio::test]
    async fn failed_compute_is_not_cached() {
        let cache = ReadThroughCache::new(Arc::new(MemoryCacheStore::new(16)));
        let calls = AtomicUsize::new(0);

        let _: Result<u32, &str> = cache
            .get_or_compute("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("repo down")
            })
            .await;
        let value: u32 = cache
            .get_or_compute("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(9)
            })
            .await
            .unwrap();

        assert_eq!(value, 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
