//! Project catalog: cached reads, quota-free admin writes, image attachment.

use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::cache::{CacheConfig, CacheInvalidator, CacheKeyEngine, ReadThroughCache};
use crate::domain::entities::ProjectRecord;
use crate::domain::error::DomainError;
use crate::infra::images::{DerivativeDescriptor, DerivativePipeline, DerivativeSpec};
use crate::infra::uploads::{StoredUpload, UploadStorage, UploadStorageError};

use super::error::AppError;
use super::repos::{
    NewProject, ProjectChanges, ProjectImageRefs, ProjectQueryFilter, ProjectsRepo, ViewTarget,
};
use super::views::ViewCounter;

const NAMESPACE: &str = "projects";
const OVERVIEW_NAMESPACE: &str = "overview";
const TARGET: &str = "vitrine::catalog";

/// Result of attaching an image to a project.
///
/// The source record always survives; `derivative_error` carries the failure
/// when generation did not produce usable derivatives, so the caller can
/// report it and retry later.
#[derive(Debug)]
pub struct ImageAttachment {
    pub source: StoredUpload,
    pub derivatives: Vec<DerivativeDescriptor>,
    pub derivative_error: Option<String>,
}

pub struct CatalogService {
    projects: Arc<dyn ProjectsRepo>,
    cache: Arc<ReadThroughCache>,
    invalidator: CacheInvalidator,
    keys: CacheKeyEngine,
    views: ViewCounter,
    config: CacheConfig,
    uploads: Arc<UploadStorage>,
    pipeline: Arc<DerivativePipeline>,
    derivative_specs: Vec<DerivativeSpec>,
}

impl CatalogService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        projects: Arc<dyn ProjectsRepo>,
        cache: Arc<ReadThroughCache>,
        invalidator: CacheInvalidator,
        keys: CacheKeyEngine,
        views: ViewCounter,
        config: CacheConfig,
        uploads: Arc<UploadStorage>,
        pipeline: Arc<DerivativePipeline>,
        derivative_specs: Vec<DerivativeSpec>,
    ) -> Self {
        Self {
            projects,
            cache,
            invalidator,
            keys,
            views,
            config,
            uploads,
            pipeline,
            derivative_specs,
        }
    }

    pub async fn list(&self, filter: &ProjectQueryFilter) -> Result<Vec<ProjectRecord>, AppError> {
        let mut keyed: Vec<(&str, &str)> = Vec::new();
        if let Some(search) = filter.search.as_deref() {
            keyed.push(("search", search));
        }
        if let Some(technology) = filter.technology.as_deref() {
            keyed.push(("technology", technology));
        }
        let key = self
            .keys
            .build(NAMESPACE, &["list"], &keyed)
            .expect("static namespace is non-empty");

        let projects = self
            .cache
            .get_or_compute(&key, self.config.list_ttl(), || async {
                self.projects.list_projects(filter).await
            })
            .await?;
        Ok(projects)
    }

    /// Fetch one project and record a view against it.
    ///
    /// The view is counted whether the payload came from cache or from the
    /// store; counters reflect real traffic.
    pub async fn detail(&self, id: Uuid) -> Result<Option<ProjectRecord>, AppError> {
        let id_text = id.to_string();
        let key = self
            .keys
            .build(NAMESPACE, &["detail", &id_text], &[])
            .expect("static namespace is non-empty");

        let found: Option<ProjectRecord> = self
            .cache
            .get_or_compute(&key, self.config.detail_ttl(), || async {
                self.projects.find_project(id).await
            })
            .await?;

        if found.is_some() {
            self.views.record(ViewTarget::Project(id)).await;
        }
        Ok(found)
    }

    pub async fn create(&self, draft: NewProject) -> Result<ProjectRecord, AppError> {
        validate_project(&draft.title, &draft.description)?;
        let created = self.projects.create_project(draft).await?;
        self.invalidate_after_write().await;
        Ok(created)
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> Result<Option<ProjectRecord>, AppError> {
        validate_project(&changes.title, &changes.description)?;
        let updated = self.projects.update_project(id, changes).await?;
        if updated.is_some() {
            self.invalidate_after_write().await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let deleted = self.projects.delete_project(id).await?;
        if deleted {
            self.invalidate_after_write().await;
        }
        Ok(deleted)
    }

    /// Store an uploaded source image, generate derivatives, and persist the
    /// references on the project.
    ///
    /// Derivative generation runs synchronously before the write completes.
    /// When it fails, the source reference is still persisted: the project is
    /// allowed to exist without a derivative until a retry succeeds.
    pub async fn attach_image(
        &self,
        id: Uuid,
        original_name: &str,
        data: Bytes,
    ) -> Result<ImageAttachment, AppError> {
        if self.projects.find_project(id).await?.is_none() {
            return Err(DomainError::not_found("project").into());
        }

        let source = self
            .uploads
            .store(original_name, data.clone())
            .await
            .map_err(map_upload_error)?;

        let (derivatives, derivative_error) = match self
            .pipeline
            .generate(data, &source.checksum, &self.derivative_specs)
            .await
        {
            Ok(derivatives) => (derivatives, None),
            Err(err) => {
                warn!(
                    target: TARGET,
                    project = %id,
                    error = %err,
                    "derivative generation failed, keeping source without derivative"
                );
                metrics::counter!("vitrine_derivative_failed_total").increment(1);
                (Vec::new(), Some(err.to_string()))
            }
        };

        // Derivatives are final on disk before the entity reference moves.
        let refs = ProjectImageRefs {
            image_path: source.stored_path.clone(),
            derivative_path: derivatives.first().map(|d| d.stored_path.clone()),
        };
        self.projects.set_project_image(id, refs).await?;
        self.invalidate_after_write().await;

        if derivative_error.is_none() {
            metrics::counter!("vitrine_derivative_generated_total")
                .increment(derivatives.len() as u64);
        }

        Ok(ImageAttachment {
            source,
            derivatives,
            derivative_error,
        })
    }

    async fn invalidate_after_write(&self) {
        self.invalidator.invalidate(NAMESPACE).await;
        self.invalidator.invalidate(OVERVIEW_NAMESPACE).await;
    }
}

fn validate_project(title: &str, description: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("project title must not be empty").into());
    }
    if title.len() > 200 {
        return Err(DomainError::validation("project title exceeds 200 characters").into());
    }
    if description.trim().is_empty() {
        return Err(DomainError::validation("project description must not be empty").into());
    }
    Ok(())
}

fn map_upload_error(err: UploadStorageError) -> AppError {
    match err {
        UploadStorageError::EmptyPayload
        | UploadStorageError::PayloadTooLarge { .. }
        | UploadStorageError::UnsupportedType { .. } => AppError::validation(err.to_string()),
        UploadStorageError::InvalidPath => AppError::unexpected(err.to_string()),
        UploadStorageError::Io(io) => AppError::from(crate::infra::error::InfraError::Io(io)),
    }
}
