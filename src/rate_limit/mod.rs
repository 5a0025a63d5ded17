//! Fixed-window request quotas for public write endpoints.
//!
//! The limiter answers allow/deny atomically with the counter increment: two
//! concurrent requests contending for the last slot in a window can never
//! both pass. When the counter store is unavailable the limiter fails OPEN.
//! Availability of the public write path wins over strict quota enforcement,
//! and every fail-open is logged as a warning.
//!
//! Windows are fixed, not sliding: a burst straddling a window edge can admit
//! up to twice the limit in quick succession.

mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

pub use store::{MemoryRateStore, RateStore, RateStoreError};

const TARGET: &str = "vitrine::rate_limit";

/// A per-action request budget.
#[derive(Debug, Clone, Copy)]
pub struct RateBudget {
    pub limit: u32,
    pub window: Duration,
}

impl RateBudget {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Fixed-window rate limiter over an injected counter store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self { store }
    }

    /// Check and consume one slot of `identity`'s budget for `action`.
    ///
    /// Distinct `(identity, action)` pairs have independent budgets.
    pub async fn allow(&self, identity: &str, action: &str, budget: RateBudget) -> RateDecision {
        let key = format!("{identity}:{action}");

        match self
            .store
            .check_and_increment(&key, budget.limit, budget.window)
            .await
        {
            Ok(decision @ RateDecision::Allowed { .. }) => {
                metrics::counter!("vitrine_rate_limit_allowed_total").increment(1);
                decision
            }
            Ok(decision @ RateDecision::Denied { .. }) => {
                metrics::counter!("vitrine_rate_limit_denied_total").increment(1);
                debug!(target: TARGET, identity, action, "request denied by quota");
                decision
            }
            Err(err) => {
                // Fail open: a counter-store outage must not take down the
                // public write path.
                metrics::counter!("vitrine_rate_limit_fail_open_total").increment(1);
                warn!(
                    target: TARGET,
                    identity,
                    action,
                    error = %err,
                    "rate-limit store unavailable, failing open"
                );
                RateDecision::Allowed { remaining: 0 }
            }
        }
    }
}
