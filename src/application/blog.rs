//! Blog posts: cached reads and admin writes.

use std::sync::Arc;

use crate::cache::{CacheConfig, CacheInvalidator, CacheKeyEngine, ReadThroughCache};
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::derive_slug;

use super::error::AppError;
use super::repos::{NewPost, PostChanges, PostQueryFilter, PostsRepo, ViewTarget};
use super::views::ViewCounter;

const NAMESPACE: &str = "posts";
const OVERVIEW_NAMESPACE: &str = "overview";

/// Input for creating a post. The slug is derived from the title when the
/// caller does not supply one.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub slug: Option<String>,
    pub body: String,
    pub excerpt: String,
    pub author_name: String,
}

pub struct BlogService {
    posts: Arc<dyn PostsRepo>,
    cache: Arc<ReadThroughCache>,
    invalidator: CacheInvalidator,
    keys: CacheKeyEngine,
    views: ViewCounter,
    config: CacheConfig,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        cache: Arc<ReadThroughCache>,
        invalidator: CacheInvalidator,
        keys: CacheKeyEngine,
        views: ViewCounter,
        config: CacheConfig,
    ) -> Self {
        Self {
            posts,
            cache,
            invalidator,
            keys,
            views,
            config,
        }
    }

    pub async fn list(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, AppError> {
        let mut keyed: Vec<(&str, &str)> = Vec::new();
        if let Some(search) = filter.search.as_deref() {
            keyed.push(("search", search));
        }
        let key = self
            .keys
            .build(NAMESPACE, &["list"], &keyed)
            .expect("static namespace is non-empty");

        let posts = self
            .cache
            .get_or_compute(&key, self.config.list_ttl(), || async {
                self.posts.list_posts(filter).await
            })
            .await?;
        Ok(posts)
    }

    /// Fetch one post by slug and record a view against it.
    pub async fn detail(&self, slug: &str) -> Result<Option<PostRecord>, AppError> {
        let key = self
            .keys
            .build(NAMESPACE, &["detail", slug], &[])
            .expect("static namespace is non-empty");

        let found: Option<PostRecord> = self
            .cache
            .get_or_compute(&key, self.config.detail_ttl(), || async {
                self.posts.find_post_by_slug(slug).await
            })
            .await?;

        if let Some(post) = &found {
            self.views.record(ViewTarget::Post(post.id)).await;
        }
        Ok(found)
    }

    pub async fn create(&self, draft: PostDraft) -> Result<PostRecord, AppError> {
        validate_post(&draft.title, &draft.body)?;

        let slug = match draft.slug {
            Some(slug) if !slug.trim().is_empty() => slug,
            _ => derive_slug(&draft.title)
                .map_err(|err| DomainError::validation(err.to_string()))?,
        };

        let created = self
            .posts
            .create_post(NewPost {
                slug,
                title: draft.title,
                body: draft.body,
                excerpt: draft.excerpt,
                author_name: draft.author_name,
            })
            .await?;
        self.invalidate_after_write().await;
        Ok(created)
    }

    pub async fn update(
        &self,
        slug: &str,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, AppError> {
        validate_post(&changes.title, &changes.body)?;
        let updated = self.posts.update_post(slug, changes).await?;
        if updated.is_some() {
            self.invalidate_after_write().await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, slug: &str) -> Result<bool, AppError> {
        let deleted = self.posts.delete_post(slug).await?;
        if deleted {
            self.invalidate_after_write().await;
        }
        Ok(deleted)
    }

    async fn invalidate_after_write(&self) {
        self.invalidator.invalidate(NAMESPACE).await;
        self.invalidator.invalidate(OVERVIEW_NAMESPACE).await;
    }
}

fn validate_post(title: &str, body: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("post title must not be empty").into());
    }
    if title.len() > 200 {
        return Err(DomainError::validation("post title exceeds 200 characters").into());
    }
    if body.trim().is_empty() {
        return Err(DomainError::validation("post body must not be empty").into());
    }
    Ok(())
}
