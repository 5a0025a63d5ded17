//! Cache configuration.
//!
//! TTL profile and store limits, loaded from `vitrine.toml`.

use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_ENTRY_LIMIT: usize = 512;
const DEFAULT_MAX_KEY_LENGTH: usize = 200;
const DEFAULT_LIST_TTL_SECS: u64 = 1800;
const DEFAULT_DETAIL_TTL_SECS: u64 = 600;
const DEFAULT_OVERVIEW_TTL_SECS: u64 = 120;

/// Cache configuration from `vitrine.toml`.
///
/// TTLs step down with volatility: full listings change rarely, detail views
/// a little more often, and the aggregate overview is invalidated by the most
/// writes, so it expires first.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries held by the in-memory store.
    pub entry_limit: usize,
    /// Keys longer than this collapse to a namespace-plus-hash form.
    pub max_key_length: usize,
    /// TTL for listing endpoints, in seconds.
    pub list_ttl_secs: u64,
    /// TTL for detail endpoints, in seconds.
    pub detail_ttl_secs: u64,
    /// TTL for the aggregate overview endpoint, in seconds.
    pub overview_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_limit: DEFAULT_ENTRY_LIMIT,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            list_ttl_secs: DEFAULT_LIST_TTL_SECS,
            detail_ttl_secs: DEFAULT_DETAIL_TTL_SECS,
            overview_ttl_secs: DEFAULT_OVERVIEW_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }

    pub fn overview_ttl(&self) -> Duration {
        Duration::from_secs(self.overview_ttl_secs)
    }
}
