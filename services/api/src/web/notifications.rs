//! services/api/src/web/notifications.rs
//!
//! Handlers for an official's notification inbox.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use incident_core::{Notification, Principal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub incident_id: Uuid,
    pub recipient_email: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            message: n.message,
            incident_id: n.incident_id,
            recipient_email: n.recipient_email,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MarkReadRequest {
    pub read: bool,
}

/// List the caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "The caller's notifications", body = [NotificationResponse]),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Caller is not an official", body = ErrorBody)
    )
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let inbox = state.service.list_notifications(&principal).await?;
    Ok(Json(inbox.into_iter().map(NotificationResponse::from).collect()))
}

/// Mark one of the caller's notifications read or unread.
#[utoipa::path(
    patch,
    path = "/notifications/{id}",
    request_body = MarkReadRequest,
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Read flag updated"),
        (status = 422, description = "Missing or non-boolean `read`"),
        (status = 403, description = "Not the caller's notification", body = ErrorBody),
        (status = 404, description = "Unknown notification", body = ErrorBody)
    )
)]
pub async fn mark_notification_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(notification_id): Path<Uuid>,
    Json(req): Json<MarkReadRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .mark_notification_read(&principal, notification_id, req.read)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
