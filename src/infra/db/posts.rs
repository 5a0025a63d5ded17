use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NewPost, PostChanges, PostQueryFilter, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str =
    "id, slug, title, body, excerpt, author_name, view_count, published_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    id: Uuid,
    slug: String,
    title: String,
    body: String,
    excerpt: String,
    author_name: String,
    view_count: i64,
    published_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            body: row.body,
            excerpt: row.excerpt,
            author_name: row.author_name,
            view_count: row.view_count,
            published_at: row.published_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE 1=1 "));
        apply_filter(&mut qb, filter);
        qb.push(" ORDER BY published_at DESC, id DESC");

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn create_post(&self, draft: NewPost) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (id, slug, title, body, excerpt, author_name) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(draft.slug)
        .bind(draft.title)
        .bind(draft.body)
        .bind(draft.excerpt)
        .bind(draft.author_name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(
        &self,
        slug: &str,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET title = $2, body = $3, excerpt = $4, updated_at = now() \
             WHERE slug = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(slug)
        .bind(changes.title)
        .bind(changes.body)
        .bind(changes.excerpt)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn delete_post(&self, slug: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE slug = $1")
            .bind(slug)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostQueryFilter) {
    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND (title ILIKE ");
        qb.push_bind(format!("%{search}%"));
        qb.push(" OR body ILIKE ");
        qb.push_bind(format!("%{search}%"));
        qb.push(" OR excerpt ILIKE ");
        qb.push_bind(format!("%{search}%"));
        qb.push(")");
    }
}
