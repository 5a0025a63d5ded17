//! Shared in-memory backend for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use vitrine::application::blog::BlogService;
use vitrine::application::catalog::CatalogService;
use vitrine::application::contact::ContactService;
use vitrine::application::overview::OverviewService;
use vitrine::application::repos::{
    ContactRepo, HealthRepo, NewContactSubmission, NewPost, NewProject, OverviewRepo, PostChanges,
    PostQueryFilter, PostsRepo, ProjectChanges, ProjectImageRefs, ProjectQueryFilter,
    ProjectsRepo, RepoError, SubscribersRepo, ViewTarget, ViewsRepo,
};
use vitrine::application::views::ViewCounter;
use vitrine::cache::{
    CacheConfig, CacheInvalidator, CacheKeyEngine, MemoryCacheStore, ReadThroughCache,
};
use vitrine::domain::entities::{
    ContactSubmissionRecord, PostRecord, ProjectRecord, SubscriberRecord,
};
use vitrine::infra::http::{AdminState, PublicState};
use vitrine::infra::images::DerivativePipeline;
use vitrine::infra::uploads::UploadStorage;
use vitrine::rate_limit::{MemoryRateStore, RateLimiter};

/// In-memory implementation of every repository trait, with call counters so
/// tests can assert how often the store was actually consulted.
#[derive(Default)]
pub struct InMemoryRepo {
    pub projects: Mutex<Vec<ProjectRecord>>,
    pub posts: Mutex<Vec<PostRecord>>,
    pub submissions: Mutex<Vec<ContactSubmissionRecord>>,
    pub subscribers: Mutex<Vec<SubscriberRecord>>,
    pub project_list_calls: AtomicUsize,
    pub project_find_calls: AtomicUsize,
    pub post_find_calls: AtomicUsize,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_project(&self, title: &str) -> ProjectRecord {
        let record = ProjectRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{title} description"),
            technologies: "Rust, axum".to_string(),
            project_url: None,
            repo_url: None,
            image_path: None,
            image_derivative_path: None,
            view_count: 0,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        self.projects.lock().unwrap().push(record.clone());
        record
    }

    pub fn seed_post(&self, slug: &str) -> PostRecord {
        let record = PostRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: slug.to_string(),
            body: "Some body text for the post.".to_string(),
            excerpt: String::new(),
            author_name: "ada".to_string(),
            view_count: 0,
            published_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        self.posts.lock().unwrap().push(record.clone());
        record
    }

    pub fn project_view_count(&self, id: Uuid) -> i64 {
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.view_count)
            .unwrap_or(0)
    }

    pub fn post_view_count(&self, id: Uuid) -> i64 {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.view_count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ProjectsRepo for InMemoryRepo {
    async fn list_projects(
        &self,
        filter: &ProjectQueryFilter,
    ) -> Result<Vec<ProjectRecord>, RepoError> {
        self.project_list_calls.fetch_add(1, Ordering::SeqCst);
        let projects = self.projects.lock().unwrap();
        Ok(projects
            .iter()
            .filter(|p| {
                filter
                    .search
                    .as_ref()
                    .is_none_or(|s| p.title.contains(s.as_str()))
            })
            .filter(|p| {
                filter
                    .technology
                    .as_ref()
                    .is_none_or(|t| p.technologies.contains(t.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<ProjectRecord>, RepoError> {
        self.project_find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn create_project(&self, draft: NewProject) -> Result<ProjectRecord, RepoError> {
        let record = ProjectRecord {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            technologies: draft.technologies,
            project_url: draft.project_url,
            repo_url: draft.repo_url,
            image_path: None,
            image_derivative_path: None,
            view_count: 0,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        self.projects.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> Result<Option<ProjectRecord>, RepoError> {
        let mut projects = self.projects.lock().unwrap();
        let Some(record) = projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        record.title = changes.title;
        record.description = changes.description;
        record.technologies = changes.technologies;
        record.project_url = changes.project_url;
        record.repo_url = changes.repo_url;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Some(record.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut projects = self.projects.lock().unwrap();
        let before = projects.len();
        projects.retain(|p| p.id != id);
        Ok(projects.len() < before)
    }

    async fn set_project_image(
        &self,
        id: Uuid,
        refs: ProjectImageRefs,
    ) -> Result<(), RepoError> {
        let mut projects = self.projects.lock().unwrap();
        let record = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        record.image_path = Some(refs.image_path);
        record.image_derivative_path = refs.derivative_path;
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepo {
    async fn list_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.lock().unwrap();
        Ok(posts
            .iter()
            .filter(|p| {
                filter
                    .search
                    .as_ref()
                    .is_none_or(|s| p.title.contains(s.as_str()) || p.body.contains(s.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        self.post_find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn create_post(&self, draft: NewPost) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        if posts.iter().any(|p| p.slug == draft.slug) {
            return Err(RepoError::Duplicate {
                constraint: "posts_slug_key".to_string(),
            });
        }
        let record = PostRecord {
            id: Uuid::new_v4(),
            slug: draft.slug,
            title: draft.title,
            body: draft.body,
            excerpt: draft.excerpt,
            author_name: draft.author_name,
            view_count: 0,
            published_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        posts.push(record.clone());
        Ok(record)
    }

    async fn update_post(
        &self,
        slug: &str,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let Some(record) = posts.iter_mut().find(|p| p.slug == slug) else {
            return Ok(None);
        };
        record.title = changes.title;
        record.body = changes.body;
        record.excerpt = changes.excerpt;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Some(record.clone()))
    }

    async fn delete_post(&self, slug: &str) -> Result<bool, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.slug != slug);
        Ok(posts.len() < before)
    }
}

#[async_trait]
impl ContactRepo for InMemoryRepo {
    async fn insert_submission(
        &self,
        submission: NewContactSubmission,
    ) -> Result<ContactSubmissionRecord, RepoError> {
        let record = ContactSubmissionRecord {
            id: Uuid::new_v4(),
            name: submission.name,
            email: submission.email,
            subject: submission.subject,
            message: submission.message,
            client_ip: submission.client_ip,
            submitted_at: OffsetDateTime::now_utc(),
        };
        self.submissions.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_submissions(
        &self,
        limit: u32,
    ) -> Result<Vec<ContactSubmissionRecord>, RepoError> {
        let submissions = self.submissions.lock().unwrap();
        Ok(submissions.iter().take(limit as usize).cloned().collect())
    }
}

#[async_trait]
impl SubscribersRepo for InMemoryRepo {
    async fn insert_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError> {
        let mut subscribers = self.subscribers.lock().unwrap();
        if subscribers.iter().any(|s| s.email == email) {
            return Err(RepoError::Duplicate {
                constraint: "subscribers_email_key".to_string(),
            });
        }
        let record = SubscriberRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            subscribed_at: OffsetDateTime::now_utc(),
        };
        subscribers.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ViewsRepo for InMemoryRepo {
    async fn increment_views(&self, target: ViewTarget) -> Result<i64, RepoError> {
        // mirrors the SQL relative update: one lock, increment in place
        match target {
            ViewTarget::Project(id) => {
                let mut projects = self.projects.lock().unwrap();
                let record = projects
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(RepoError::NotFound)?;
                record.view_count += 1;
                Ok(record.view_count)
            }
            ViewTarget::Post(id) => {
                let mut posts = self.posts.lock().unwrap();
                let record = posts
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(RepoError::NotFound)?;
                record.view_count += 1;
                Ok(record.view_count)
            }
        }
    }
}

#[async_trait]
impl OverviewRepo for InMemoryRepo {
    async fn count_projects(&self) -> Result<u64, RepoError> {
        Ok(self.projects.lock().unwrap().len() as u64)
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        Ok(self.posts.lock().unwrap().len() as u64)
    }

    async fn recent_projects(&self, limit: u32) -> Result<Vec<ProjectRecord>, RepoError> {
        let projects = self.projects.lock().unwrap();
        Ok(projects.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn recent_posts(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.lock().unwrap();
        Ok(posts.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[async_trait]
impl HealthRepo for InMemoryRepo {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Everything a test needs to drive the service and HTTP layers.
pub struct TestBackend {
    pub repo: Arc<InMemoryRepo>,
    pub cache_store: Arc<MemoryCacheStore>,
    pub catalog: Arc<CatalogService>,
    pub blog: Arc<BlogService>,
    pub contact: Arc<ContactService>,
    pub overview: Arc<OverviewService>,
    pub public_state: PublicState,
    pub admin_state: AdminState,
    // temp dirs live as long as the backend
    pub upload_dir: tempfile::TempDir,
    pub derivative_dir: tempfile::TempDir,
}

pub struct BackendOptions {
    pub contact_limit: u32,
    pub subscribe_limit: u32,
    pub cache: CacheConfig,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            contact_limit: 5,
            subscribe_limit: 3,
            cache: CacheConfig::default(),
        }
    }
}

pub fn build_backend(options: BackendOptions) -> TestBackend {
    use std::time::Duration;
    use vitrine::rate_limit::RateBudget;

    let repo = Arc::new(InMemoryRepo::new());
    let cache_store = Arc::new(MemoryCacheStore::new(options.cache.entry_limit));
    let cache = Arc::new(ReadThroughCache::new(cache_store.clone()));
    let invalidator = CacheInvalidator::new(cache_store.clone());
    let keys = CacheKeyEngine::new(options.cache.max_key_length);
    let views = ViewCounter::new(repo.clone());
    let limiter = RateLimiter::new(Arc::new(MemoryRateStore::new()));

    let upload_dir = tempfile::tempdir().unwrap();
    let derivative_dir = tempfile::tempdir().unwrap();
    let uploads = Arc::new(
        UploadStorage::new(upload_dir.path().to_path_buf(), 5 * 1024 * 1024).unwrap(),
    );
    let derivative_files = Arc::new(
        UploadStorage::new(derivative_dir.path().to_path_buf(), 5 * 1024 * 1024).unwrap(),
    );
    let pipeline = Arc::new(
        DerivativePipeline::new(derivative_dir.path().to_path_buf(), [255, 255, 255]).unwrap(),
    );

    let specs = vec![
        vitrine::infra::images::DerivativeSpec {
            label: "display".to_string(),
            max_width: 400,
            max_height: 300,
            quality: 85,
        },
        vitrine::infra::images::DerivativeSpec {
            label: "thumb".to_string(),
            max_width: 100,
            max_height: 100,
            quality: 80,
        },
    ];

    let catalog = Arc::new(CatalogService::new(
        repo.clone(),
        cache.clone(),
        invalidator.clone(),
        keys.clone(),
        views.clone(),
        options.cache.clone(),
        uploads.clone(),
        pipeline,
        specs,
    ));
    let blog = Arc::new(BlogService::new(
        repo.clone(),
        cache.clone(),
        invalidator,
        keys.clone(),
        views,
        options.cache.clone(),
    ));
    let contact = Arc::new(ContactService::new(
        repo.clone(),
        repo.clone(),
        limiter,
        RateBudget::new(options.contact_limit, Duration::from_secs(60)),
        RateBudget::new(options.subscribe_limit, Duration::from_secs(60)),
    ));
    let overview = Arc::new(OverviewService::new(
        repo.clone(),
        cache,
        keys,
        options.cache,
    ));

    let public_state = PublicState {
        catalog: catalog.clone(),
        blog: blog.clone(),
        contact: contact.clone(),
        overview: overview.clone(),
        health: repo.clone(),
        media_sources: uploads,
        media_derivatives: derivative_files,
    };
    let admin_state = AdminState {
        catalog: catalog.clone(),
        blog: blog.clone(),
        contact: contact.clone(),
    };

    TestBackend {
        repo,
        cache_store,
        catalog,
        blog,
        contact,
        overview,
        public_state,
        admin_state,
        upload_dir,
        derivative_dir,
    }
}
