//! View counting for content entities.

use std::sync::Arc;

use tracing::warn;

use super::repos::{ViewTarget, ViewsRepo};

const TARGET: &str = "vitrine::views";

/// Records one view against a content entity.
///
/// Counts reflect real traffic: the increment runs on every detail read,
/// regardless of whether the response came from cache. The increment itself
/// is atomic at the storage layer; a failed increment is logged and swallowed
/// because a missed view must never fail the read that triggered it.
#[derive(Clone)]
pub struct ViewCounter {
    views: Arc<dyn ViewsRepo>,
}

impl ViewCounter {
    pub fn new(views: Arc<dyn ViewsRepo>) -> Self {
        Self { views }
    }

    /// Persist one view. Returns the fresh count, or `None` when the
    /// increment failed and was swallowed.
    pub async fn record(&self, target: ViewTarget) -> Option<i64> {
        match self.views.increment_views(target).await {
            Ok(count) => Some(count),
            Err(err) => {
                metrics::counter!("vitrine_view_increment_failed_total").increment(1);
                warn!(
                    target: TARGET,
                    entity = ?target,
                    error = %err,
                    "view-count increment failed, continuing without it"
                );
                None
            }
        }
    }
}
