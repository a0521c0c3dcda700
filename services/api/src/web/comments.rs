//! services/api/src/web/comments.rs
//!
//! Handlers for an incident's append-only comment thread.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use incident_core::{Comment, Principal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::incidents::PersonResponse;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub content: String,
    pub author: PersonResponse,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            author: comment.author.into(),
            created_at: comment.created_at,
        }
    }
}

/// Append a comment to an incident.
#[utoipa::path(
    post,
    path = "/incidents/{id}/comments",
    request_body = AddCommentRequest,
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 201, description = "Comment appended", body = CommentResponse),
        (status = 400, description = "Empty comment", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 404, description = "Unknown incident", body = ErrorBody)
    )
)]
pub async fn add_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(incident_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .service
        .add_comment(&principal, incident_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

/// List an incident's comments in the order they were written.
#[utoipa::path(
    get,
    path = "/incidents/{id}/comments",
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 200, description = "The comment thread", body = [CommentResponse]),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 404, description = "Unknown incident", body = ErrorBody)
    )
)]
pub async fn list_comments_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(incident_id): Path<Uuid>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let thread = state.service.list_comments(&principal, incident_id).await?;
    Ok(Json(thread.into_iter().map(CommentResponse::from).collect()))
}
