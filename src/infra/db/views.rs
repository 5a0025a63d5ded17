use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{RepoError, ViewTarget, ViewsRepo};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl ViewsRepo for PostgresRepositories {
    /// Increment the entity's counter in the database.
    ///
    /// The relative `view_count = view_count + 1` update serializes at the
    /// row level; concurrent increments from independent request handlers
    /// cannot lose updates the way a read-modify-write round-trip would.
    async fn increment_views(&self, target: ViewTarget) -> Result<i64, RepoError> {
        let (table, id): (&str, Uuid) = match target {
            ViewTarget::Project(id) => ("projects", id),
            ViewTarget::Post(id) => ("posts", id),
        };

        let count: i64 = sqlx::query_scalar(&format!(
            "UPDATE {table} SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(count)
    }
}
