//! Vitrine cache system.
//!
//! Read-through caching for the public content API:
//!
//! - **CacheKeyEngine**: deterministic, bounded-length keys
//! - **CacheStore**: injected key/value backend with per-entry TTL
//! - **ReadThroughCache**: get-or-compute-and-store around repo queries
//! - **CacheInvalidator**: best-effort prefix invalidation after writes
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `vitrine.toml`:
//!
//! ```toml
//! [cache]
//! entry_limit = 512
//! max_key_length = 200
//! list_ttl_secs = 1800
//! # ... see config.rs for all options
//! ```

mod config;
mod invalidator;
mod keys;
mod lock;
mod read_through;
mod store;

pub use config::CacheConfig;
pub use invalidator::CacheInvalidator;
pub use keys::{CacheKeyEngine, CacheKeyError, DEFAULT_MAX_KEY_LENGTH};
pub use read_through::ReadThroughCache;
pub use store::{CacheStore, CacheStoreError, MemoryCacheStore};
