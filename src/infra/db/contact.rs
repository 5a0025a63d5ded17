use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    ContactRepo, NewContactSubmission, OverviewRepo, RepoError, SubscribersRepo,
};
use crate::domain::entities::{ContactSubmissionRecord, PostRecord, ProjectRecord, SubscriberRecord};

use super::posts::PostRow;
use super::projects::ProjectRow;
use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: Uuid,
    name: String,
    email: String,
    subject: String,
    message: String,
    client_ip: Option<String>,
    submitted_at: OffsetDateTime,
}

impl From<SubmissionRow> for ContactSubmissionRecord {
    fn from(row: SubmissionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            subject: row.subject,
            message: row.message,
            client_ip: row.client_ip,
            submitted_at: row.submitted_at,
        }
    }
}

#[async_trait]
impl ContactRepo for PostgresRepositories {
    async fn insert_submission(
        &self,
        submission: NewContactSubmission,
    ) -> Result<ContactSubmissionRecord, RepoError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            "INSERT INTO contact_submissions (id, name, email, subject, message, client_ip) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, name, email, subject, message, client_ip, submitted_at",
        )
        .bind(Uuid::new_v4())
        .bind(submission.name)
        .bind(submission.email)
        .bind(submission.subject)
        .bind(submission.message)
        .bind(submission.client_ip)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn list_submissions(
        &self,
        limit: u32,
    ) -> Result<Vec<ContactSubmissionRecord>, RepoError> {
        let limit = limit.clamp(1, 200) as i64;
        let rows = sqlx::query_as::<_, SubmissionRow>(
            "SELECT id, name, email, subject, message, client_ip, submitted_at \
             FROM contact_submissions \
             ORDER BY submitted_at DESC, id DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ContactSubmissionRecord::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    subscribed_at: OffsetDateTime,
}

#[async_trait]
impl SubscribersRepo for PostgresRepositories {
    async fn insert_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            "INSERT INTO subscribers (id, email) VALUES ($1, $2) \
             RETURNING id, email, subscribed_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubscriberRecord {
            id: row.id,
            email: row.email,
            subscribed_at: row.subscribed_at,
        })
    }
}

#[async_trait]
impl OverviewRepo for PostgresRepositories {
    async fn count_projects(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn recent_projects(&self, limit: u32) -> Result<Vec<ProjectRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, title, description, technologies, project_url, repo_url, \
             image_path, image_derivative_path, view_count, created_at, updated_at \
             FROM projects ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit.clamp(1, 50) as i64)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProjectRecord::from).collect())
    }

    async fn recent_posts(&self, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT id, slug, title, body, excerpt, author_name, view_count, published_at, updated_at \
             FROM posts ORDER BY published_at DESC, id DESC LIMIT $1",
        )
        .bind(limit.clamp(1, 50) as i64)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }
}

fn convert_count(value: i64) -> Result<u64, RepoError> {
    value
        .try_into()
        .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
}
