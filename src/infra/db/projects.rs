use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    NewProject, ProjectChanges, ProjectImageRefs, ProjectQueryFilter, ProjectsRepo, RepoError,
};
use crate::domain::entities::ProjectRecord;

use super::{PostgresRepositories, map_sqlx_error};

const PROJECT_COLUMNS: &str = "id, title, description, technologies, project_url, repo_url, \
     image_path, image_derivative_path, view_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct ProjectRow {
    id: Uuid,
    title: String,
    description: String,
    technologies: String,
    project_url: Option<String>,
    repo_url: Option<String>,
    image_path: Option<String>,
    image_derivative_path: Option<String>,
    view_count: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProjectRow> for ProjectRecord {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            technologies: row.technologies,
            project_url: row.project_url,
            repo_url: row.repo_url,
            image_path: row.image_path,
            image_derivative_path: row.image_derivative_path,
            view_count: row.view_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ProjectsRepo for PostgresRepositories {
    async fn list_projects(
        &self,
        filter: &ProjectQueryFilter,
    ) -> Result<Vec<ProjectRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE 1=1 "));
        apply_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb
            .build_query_as::<ProjectRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProjectRecord::from).collect())
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<ProjectRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProjectRecord::from))
    }

    async fn create_project(&self, draft: NewProject) -> Result<ProjectRecord, RepoError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "INSERT INTO projects (id, title, description, technologies, project_url, repo_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(draft.title)
        .bind(draft.description)
        .bind(draft.technologies)
        .bind(draft.project_url)
        .bind(draft.repo_url)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> Result<Option<ProjectRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "UPDATE projects SET title = $2, description = $3, technologies = $4, \
             project_url = $5, repo_url = $6, updated_at = now() \
             WHERE id = $1 \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.technologies)
        .bind(changes.project_url)
        .bind(changes.repo_url)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProjectRecord::from))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_project_image(
        &self,
        id: Uuid,
        refs: ProjectImageRefs,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE projects SET image_path = $2, image_derivative_path = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(refs.image_path)
        .bind(refs.derivative_path)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q ProjectQueryFilter) {
    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND (title ILIKE ");
        qb.push_bind(format!("%{search}%"));
        qb.push(" OR description ILIKE ");
        qb.push_bind(format!("%{search}%"));
        qb.push(")");
    }

    if let Some(technology) = filter.technology.as_ref() {
        qb.push(" AND technologies ILIKE ");
        qb.push_bind(format!("%{technology}%"));
        qb.push(' ');
    }
}
