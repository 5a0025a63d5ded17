//! Admin data-entry surface.
//!
//! Bound to a separate, operator-guarded address; access control is a
//! deployment concern, the same posture the rest of the service takes toward
//! sessions and users.

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::blog::PostDraft;
use crate::application::repos::{NewProject, PostChanges, ProjectChanges};

use super::error::ApiError;
use super::state::AdminState;

const DEFAULT_SUBMISSION_PAGE: u32 = 50;

pub fn build_admin_router(state: AdminState, upload_body_limit: usize) -> Router {
    Router::new()
        .route("/admin/api/projects", post(create_project))
        .route(
            "/admin/api/projects/{id}",
            put(update_project).delete(delete_project),
        )
        .route("/admin/api/projects/{id}/image", post(upload_project_image))
        .route("/admin/api/posts", post(create_post))
        .route(
            "/admin/api/posts/{slug}",
            put(update_post).delete(delete_post),
        )
        .route("/admin/api/contact", get(list_submissions))
        .layer(DefaultBodyLimit::max(upload_body_limit))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ProjectPayload {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub technologies: String,
    pub project_url: Option<String>,
    pub repo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostPayload {
    pub title: String,
    pub slug: Option<String>,
    pub body: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default = "default_author")]
    pub author_name: String,
}

fn default_author() -> String {
    "admin".to_string()
}

#[derive(Debug, Deserialize)]
pub struct PostUpdatePayload {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub excerpt: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionListQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub source_path: String,
    pub checksum: String,
    pub derivatives: Vec<DerivativeView>,
    /// Present when the source was stored but derivative generation failed;
    /// re-upload to retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivative_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DerivativeView {
    pub label: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
}

async fn create_project(
    State(state): State<AdminState>,
    Json(payload): Json<ProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .catalog
        .create(NewProject {
            title: payload.title,
            description: payload.description,
            technologies: payload.technologies,
            project_url: payload.project_url,
            repo_url: payload.repo_url,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_project(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .catalog
        .update(
            id,
            ProjectChanges {
                title: payload.title,
                description: payload.description,
                technologies: payload.technologies,
                project_url: payload.project_url,
                repo_url: payload.repo_url,
            },
        )
        .await?;

    match updated {
        Some(project) => Ok(Json(project)),
        None => Err(ApiError::not_found("project not found")),
    }
}

async fn delete_project(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    if state.catalog.delete(id).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(ApiError::not_found("project not found"))
    }
}

/// Accept a multipart image upload and attach it to the project.
///
/// The derivative pipeline runs synchronously inside this request. A
/// generation failure still returns 200: the source is stored and referenced,
/// and the error rides along in the body.
async fn upload_project_image(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("malformed multipart body: {err}")))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|err| ApiError::bad_request(format!("upload read failed: {err}")))?;
            upload = Some((file_name, data));
            break;
        }
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::bad_request("multipart field `file` is required"))?;

    let attachment = state.catalog.attach_image(id, &file_name, data).await?;

    Ok(Json(AttachmentResponse {
        source_path: attachment.source.stored_path,
        checksum: attachment.source.checksum,
        derivatives: attachment
            .derivatives
            .into_iter()
            .map(|derivative| DerivativeView {
                label: derivative.label,
                path: derivative.stored_path,
                width: derivative.width,
                height: derivative.height,
            })
            .collect(),
        derivative_error: attachment.derivative_error,
    }))
}

async fn create_post(
    State(state): State<AdminState>,
    Json(payload): Json<PostPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .blog
        .create(PostDraft {
            title: payload.title,
            slug: payload.slug,
            body: payload.body,
            excerpt: payload.excerpt,
            author_name: payload.author_name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_post(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
    Json(payload): Json<PostUpdatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .blog
        .update(
            &slug,
            PostChanges {
                title: payload.title,
                body: payload.body,
                excerpt: payload.excerpt,
            },
        )
        .await?;

    match updated {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::not_found("post not found")),
    }
}

async fn delete_post(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    if state.blog.delete(&slug).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(ApiError::not_found("post not found"))
    }
}

async fn list_submissions(
    State(state): State<AdminState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_SUBMISSION_PAGE).clamp(1, 200);
    let submissions = state.contact.list_submissions(limit).await?;
    Ok(Json(submissions))
}
