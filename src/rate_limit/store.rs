//! Counter stores backing the fixed-window limiter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use super::RateDecision;

#[derive(Debug, Error)]
pub enum RateStoreError {
    #[error("rate-limit backend unavailable: {0}")]
    Unavailable(String),
}

/// Atomic check-and-increment against a windowed counter.
///
/// Implementations must not expose a read-then-write gap: the check and the
/// increment happen under one exclusive operation per identity, so that when
/// exactly one slot remains, at most one concurrent caller is allowed.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn check_and_increment(
        &self,
        identity: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateDecision, RateStoreError>;
}

struct FixedWindow {
    count: u32,
    started_at: Instant,
    length: Duration,
}

/// In-memory fixed-window counters.
///
/// The map entry lock makes check-and-increment atomic per identity. Denied
/// calls leave the counter untouched, so repeated denials cannot inflate
/// stored state.
pub struct MemoryRateStore {
    windows: DashMap<String, FixedWindow>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Drop windows that have fully elapsed. Windows expire naturally on next
    /// use; this reclaims memory for identities that never return.
    pub fn prune_expired(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, window| now.duration_since(window.started_at) < window.length);
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl Default for MemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn check_and_increment(
        &self,
        identity: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateDecision, RateStoreError> {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(identity.to_string())
            .or_insert_with(|| FixedWindow {
                count: 0,
                started_at: now,
                length: window,
            });

        let elapsed = now.duration_since(entry.started_at);
        if elapsed >= window {
            entry.count = 0;
            entry.started_at = now;
            entry.length = window;
        }

        if entry.count >= limit {
            let retry_after = window.saturating_sub(now.duration_since(entry.started_at));
            return Ok(RateDecision::Denied { retry_after });
        }

        entry.count += 1;
        Ok(RateDecision::Allowed {
            remaining: limit - entry.count,
        })
    }
}
