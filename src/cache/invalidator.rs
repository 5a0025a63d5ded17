//! Best-effort invalidation of cache entries by key prefix.

use std::sync::Arc;

use tracing::{debug, warn};

use super::store::{CacheStore, CacheStoreError};

const TARGET: &str = "vitrine::cache";

/// Clears cache entries whose keys share a prefix after a write.
///
/// Invalidation never fails the surrounding write: a backend that cannot
/// enumerate keys leaves staleness bounded by entry TTLs, and backend errors
/// are logged only.
#[derive(Clone)]
pub struct CacheInvalidator {
    store: Arc<dyn CacheStore>,
}

impl CacheInvalidator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn invalidate(&self, prefix: &str) {
        match self.store.remove_prefix(prefix).await {
            Ok(removed) => {
                metrics::counter!("vitrine_cache_invalidated_total").increment(removed);
                debug!(target: TARGET, prefix, removed, "invalidated cache prefix");
            }
            Err(CacheStoreError::Unsupported(op)) => {
                debug!(
                    target: TARGET,
                    prefix,
                    op,
                    "backend cannot invalidate by prefix, relying on ttl expiry"
                );
            }
            Err(err) => {
                warn!(target: TARGET, prefix, error = %err, "cache invalidation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::super::read_through::ReadThroughCache;
    use super::super::store::MemoryCacheStore;
    use super::*;

    #[tokio::test]
    async fn invalidated_prefix_forces_recompute() {
        let store = Arc::new(MemoryCacheStore::new(16));
        let cache = ReadThroughCache::new(store.clone());
        let invalidator = CacheInvalidator::new(store);
        let calls = AtomicUsize::new(0);

        let compute = || async {
            let version = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(version)
        };

        let first = cache
            .get_or_compute("projects:list", Duration::from_secs(600), compute)
            .await
            .unwrap();
        assert_eq!(first, 0);

        invalidator.invalidate("projects").await;

        let second = cache
            .get_or_compute("projects:list", Duration::from_secs(600), compute)
            .await
            .unwrap();
        assert_eq!(second, 1, "pre-invalidation value must not be served");
    }
}
