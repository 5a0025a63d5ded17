//! Public read endpoints and quota-gated write endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::contact::{SubmitOutcome, SubscribeOutcome};
use crate::application::repos::{NewContactSubmission, PostQueryFilter, ProjectQueryFilter};
use crate::domain::entities::{PostRecord, ProjectRecord};
use crate::domain::text;

use super::error::ApiError;
use super::identity::client_identity;
use super::state::PublicState;

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/overview", get(overview))
        .route("/api/projects", get(list_projects))
        .route("/api/projects/{id}", get(get_project))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{slug}", get(get_post))
        .route("/api/contact", post(submit_contact))
        .route("/api/subscribe", post(subscribe))
        .route("/media/source/{*path}", get(serve_source))
        .route("/media/derived/{*path}", get(serve_derivative))
        .with_state(state)
}

// ============================================================================
// Response models
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub project_url: Option<String>,
    pub repo_url: Option<String>,
    pub image: Option<String>,
    pub views: i64,
}

impl From<ProjectRecord> for ProjectView {
    fn from(record: ProjectRecord) -> Self {
        let technologies = record.technology_list();
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            technologies,
            project_url: record.project_url,
            repo_url: record.repo_url,
            // prefer the display derivative, fall back to the source
            image: record.image_derivative_path.or(record.image_path),
            views: record.view_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub author: String,
    pub reading_minutes: usize,
    pub meta_description: String,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: time::OffsetDateTime,
}

impl From<PostRecord> for PostView {
    fn from(record: PostRecord) -> Self {
        let reading_minutes = text::reading_minutes(&record.body);
        let meta_description = text::meta_description(&record.body);
        Self {
            slug: record.slug,
            title: record.title,
            body: record.body,
            excerpt: record.excerpt,
            author: record.author_name,
            reading_minutes,
            meta_description,
            views: record.view_count,
            published_at: record.published_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    pub search: Option<String>,
    pub technology: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn healthz(State(state): State<PublicState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}

async fn overview(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let payload = state.overview.overview().await?;
    Ok(Json(payload))
}

async fn list_projects(
    State(state): State<PublicState>,
    Query(query): Query<ProjectListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ProjectQueryFilter {
        search: query.search,
        technology: query.technology,
    };
    let projects = state.catalog.list(&filter).await?;
    let views: Vec<ProjectView> = projects.into_iter().map(ProjectView::from).collect();
    Ok(Json(views))
}

async fn get_project(
    State(state): State<PublicState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.catalog.detail(id).await? {
        Some(project) => Ok(Json(ProjectView::from(project))),
        None => Err(ApiError::not_found("project not found")),
    }
}

async fn list_posts(
    State(state): State<PublicState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = PostQueryFilter {
        search: query.search,
    };
    let posts = state.blog.list(&filter).await?;
    let views: Vec<PostView> = posts.into_iter().map(PostView::from).collect();
    Ok(Json(views))
}

async fn get_post(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.blog.detail(&slug).await? {
        Some(post) => Ok(Json(PostView::from(post))),
        None => Err(ApiError::not_found("post not found")),
    }
}

async fn submit_contact(
    State(state): State<PublicState>,
    headers: HeaderMap,
    Json(request): Json<ContactRequest>,
) -> Result<Response, ApiError> {
    let identity = client_identity(&headers);
    let submission = NewContactSubmission {
        name: request.name,
        email: request.email,
        subject: request.subject,
        message: request.message,
        client_ip: Some(identity.clone()),
    };

    match state.contact.submit(&identity, submission).await? {
        SubmitOutcome::Accepted(record) => {
            let body = serde_json::json!({
                "message": "Thank you for your message! We will get back to you soon.",
                "data": *record,
            });
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        SubmitOutcome::RateLimited { retry_after } => {
            Ok(ApiError::rate_limited(retry_after.as_secs().max(1)))
        }
    }
}

async fn subscribe(
    State(state): State<PublicState>,
    headers: HeaderMap,
    Json(request): Json<SubscribeRequest>,
) -> Result<Response, ApiError> {
    let identity = client_identity(&headers);

    match state.contact.subscribe(&identity, &request.email).await? {
        SubscribeOutcome::Subscribed(record) => {
            let body = serde_json::json!({
                "message": "Subscribed. Welcome aboard!",
                "data": { "id": record.id, "email": record.email },
            });
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        SubscribeOutcome::AlreadySubscribed => {
            Ok(ApiError::duplicate("email is already subscribed").into_response())
        }
        SubscribeOutcome::RateLimited { retry_after } => {
            Ok(ApiError::rate_limited(retry_after.as_secs().max(1)))
        }
    }
}

async fn serve_source(
    State(state): State<PublicState>,
    Path(path): Path<String>,
) -> Response {
    serve_stored_file(&state.media_sources, &path).await
}

async fn serve_derivative(
    State(state): State<PublicState>,
    Path(path): Path<String>,
) -> Response {
    serve_stored_file(&state.media_derivatives, &path).await
}

async fn serve_stored_file(
    storage: &crate::infra::uploads::UploadStorage,
    path: &str,
) -> Response {
    match storage.read(path).await {
        Ok(data) => {
            let content_type = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(axum::http::header::CONTENT_TYPE, content_type.to_string())],
                data,
            )
                .into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
