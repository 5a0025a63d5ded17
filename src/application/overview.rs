//! Aggregate overview of everything the site exposes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, CacheKeyEngine, ReadThroughCache};
use crate::domain::entities::{PostRecord, ProjectRecord};

use super::error::AppError;
use super::repos::OverviewRepo;

const NAMESPACE: &str = "overview";
const RECENT_LIMIT: u32 = 5;

/// The "everything" payload for the landing surface.
///
/// This aggregate is touched by every write, so it carries the shortest TTL
/// of any cached read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewPayload {
    pub project_count: u64,
    pub post_count: u64,
    pub recent_projects: Vec<ProjectRecord>,
    pub recent_posts: Vec<PostRecord>,
}

pub struct OverviewService {
    repo: Arc<dyn OverviewRepo>,
    cache: Arc<ReadThroughCache>,
    keys: CacheKeyEngine,
    config: CacheConfig,
}

impl OverviewService {
    pub fn new(
        repo: Arc<dyn OverviewRepo>,
        cache: Arc<ReadThroughCache>,
        keys: CacheKeyEngine,
        config: CacheConfig,
    ) -> Self {
        Self {
            repo,
            cache,
            keys,
            config,
        }
    }

    pub async fn overview(&self) -> Result<OverviewPayload, AppError> {
        let key = self
            .keys
            .build(NAMESPACE, &["all"], &[])
            .expect("static namespace is non-empty");

        let payload = self
            .cache
            .get_or_compute(&key, self.config.overview_ttl(), || async {
                let project_count = self.repo.count_projects().await?;
                let post_count = self.repo.count_posts().await?;
                let recent_projects = self.repo.recent_projects(RECENT_LIMIT).await?;
                let recent_posts = self.repo.recent_posts(RECENT_LIMIT).await?;
                Ok::<_, crate::application::repos::RepoError>(OverviewPayload {
                    project_count,
                    post_count,
                    recent_projects,
                    recent_posts,
                })
            })
            .await?;
        Ok(payload)
    }
}
