//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    ContactSubmissionRecord, PostRecord, ProjectRecord, SubscriberRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProjectQueryFilter {
    pub search: Option<String>,
    pub technology: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PostQueryFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub technologies: String,
    pub project_url: Option<String>,
    pub repo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectChanges {
    pub title: String,
    pub description: String,
    pub technologies: String,
    pub project_url: Option<String>,
    pub repo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub author_name: String,
}

#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub body: String,
    pub excerpt: String,
}

#[derive(Debug, Clone)]
pub struct NewContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub client_ip: Option<String>,
}

/// Image references persisted alongside a project.
#[derive(Debug, Clone)]
pub struct ProjectImageRefs {
    pub image_path: String,
    pub derivative_path: Option<String>,
}

/// Entity whose view counter is being incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewTarget {
    Project(Uuid),
    Post(Uuid),
}

#[async_trait]
pub trait ProjectsRepo: Send + Sync {
    async fn list_projects(
        &self,
        filter: &ProjectQueryFilter,
    ) -> Result<Vec<ProjectRecord>, RepoError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<ProjectRecord>, RepoError>;

    async fn create_project(&self, draft: NewProject) -> Result<ProjectRecord, RepoError>;

    async fn update_project(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> Result<Option<ProjectRecord>, RepoError>;

    async fn delete_project(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Replace the project's image references in one field-level update.
    async fn set_project_image(
        &self,
        id: Uuid,
        refs: ProjectImageRefs,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(&self, draft: NewPost) -> Result<PostRecord, RepoError>;

    async fn update_post(
        &self,
        slug: &str,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, RepoError>;

    async fn delete_post(&self, slug: &str) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ContactRepo: Send + Sync {
    async fn insert_submission(
        &self,
        submission: NewContactSubmission,
    ) -> Result<ContactSubmissionRecord, RepoError>;

    async fn list_submissions(&self, limit: u32)
        -> Result<Vec<ContactSubmissionRecord>, RepoError>;
}

#[async_trait]
pub trait SubscribersRepo: Send + Sync {
    /// Insert a subscriber. A duplicate email surfaces as `RepoError::Duplicate`.
    async fn insert_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError>;
}

/// Atomic view-count persistence.
///
/// Implementations must increment at the storage layer (a relative
/// `view_count = view_count + 1` update, not read-modify-write), so that
/// concurrent increments never lose updates.
#[async_trait]
pub trait ViewsRepo: Send + Sync {
    async fn increment_views(&self, target: ViewTarget) -> Result<i64, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

#[async_trait]
pub trait OverviewRepo: Send + Sync {
    async fn count_projects(&self) -> Result<u64, RepoError>;
    async fn count_posts(&self) -> Result<u64, RepoError>;
    async fn recent_projects(&self, limit: u32) -> Result<Vec<ProjectRecord>, RepoError>;
    async fn recent_posts(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError>;
}
