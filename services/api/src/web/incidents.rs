//! services/api/src/web/incidents.rs
//!
//! Handlers for creating, listing, deleting and triaging incidents, along
//! with the response payloads shared by the other incident endpoints.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use incident_core::query::{IncidentPage, ListParams};
use incident_core::{
    AuditStamp, Coordinates, Incident, IncidentDraft, Location, PersonRef, PhotoUpload, Principal,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::comments::CommentResponse;
use crate::web::state::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct CoordinatesResponse {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, ToSchema)]
pub struct LocationResponse {
    pub address: String,
    pub coordinates: Option<CoordinatesResponse>,
}

impl From<Location> for LocationResponse {
    fn from(location: Location) -> Self {
        Self {
            address: location.address,
            coordinates: location
                .coordinates
                .map(|Coordinates { lat, lng }| CoordinatesResponse { lat, lng }),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PersonResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<PersonRef> for PersonResponse {
    fn from(person: PersonRef) -> Self {
        Self {
            id: person.id,
            name: person.name,
            email: person.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuditResponse {
    pub name: String,
    pub email: String,
}

impl From<AuditStamp> for AuditResponse {
    fn from(stamp: AuditStamp) -> Self {
        Self {
            name: stamp.name,
            email: stamp.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentResponse {
    pub id: Uuid,
    pub title: String,
    pub location: LocationResponse,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub severity: String,
    pub status: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub reported_by: PersonResponse,
    pub updated_by: Option<AuditResponse>,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Incident> for IncidentResponse {
    fn from(incident: Incident) -> Self {
        Self {
            id: incident.id,
            title: incident.title,
            location: incident.location.into(),
            incident_type: incident.incident_type,
            severity: incident.severity.as_str().to_string(),
            status: incident.status.as_str().to_string(),
            description: incident.description,
            photo_url: incident.photo_url,
            reported_by: incident.reported_by.into(),
            updated_by: incident.updated_by.map(AuditResponse::from),
            comments: incident
                .comments
                .into_iter()
                .map(CommentResponse::from)
                .collect(),
            created_at: incident.created_at,
            updated_at: incident.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPageResponse {
    pub incidents: Vec<IncidentResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl From<IncidentPage> for IncidentPageResponse {
    fn from(page: IncidentPage) -> Self {
        Self {
            incidents: page.incidents.into_iter().map(IncidentResponse::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListIncidentsQuery {
    /// 1-based page number.
    pub page: Option<i64>,
    /// Page size, capped at 100.
    pub limit: Option<i64>,
    /// Case-insensitive match on title, description or address.
    pub search: Option<String>,
    /// Only the caller's own reports.
    #[serde(default)]
    pub owner_only: bool,
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

//=========================================================================================
// Multipart Form Parsing
//=========================================================================================

/// Accumulates the text fields of a report form.
#[derive(Default)]
struct IncidentForm {
    draft: IncidentDraft,
    latitude: Option<String>,
    longitude: Option<String>,
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl IncidentForm {
    fn set_text(&mut self, name: &str, value: String) {
        match name {
            "title" => self.draft.title = value,
            "location" => self.draft.address = value,
            "type" => self.draft.incident_type = value,
            "severity" => self.draft.severity = value,
            "description" => self.draft.description = non_blank(value),
            "formatted_address" => self.draft.formatted_address = non_blank(value),
            "latitude" => self.latitude = non_blank(value),
            "longitude" => self.longitude = non_blank(value),
            other => debug!("Ignoring unknown form field '{}'", other),
        }
    }

    fn finish(mut self) -> Result<IncidentDraft, ApiError> {
        self.draft.coordinates = match (self.latitude, self.longitude) {
            (None, None) => None,
            (Some(lat), Some(lng)) => Some(Coordinates {
                lat: parse_coordinate("latitude", &lat)?,
                lng: parse_coordinate("longitude", &lng)?,
            }),
            _ => {
                return Err(ApiError::invalid(
                    "latitude and longitude must be sent together",
                ))
            }
        };
        Ok(self.draft)
    }
}

fn parse_coordinate(name: &str, raw: &str) -> Result<f64, ApiError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::invalid(format!("{name} must be a number")))
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::invalid(format!("Failed to read multipart data: {e}"))
}

async fn read_incident_form(multipart: &mut Multipart) -> Result<IncidentDraft, ApiError> {
    let mut form = IncidentForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let file_name = field
                .file_name()
                .map(str::to_string)
                .filter(|n| !n.is_empty());
            let data = field.bytes().await.map_err(multipart_error)?;
            // Browsers send an empty, unnamed part when no file was chosen.
            if data.is_empty() && file_name.is_none() {
                continue;
            }
            form.draft.photo = Some(PhotoUpload {
                bytes: data.to_vec(),
                content_type,
                file_name,
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.set_text(&name, value);
        }
    }
    form.finish()
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Report a new incident.
///
/// Accepts a multipart/form-data request with the fields `title`, `location`,
/// `type`, `severity`, `description`, `latitude`, `longitude`,
/// `formatted_address` and an optional `photo` file. Officials are notified
/// once the incident is stored.
#[utoipa::path(
    post,
    path = "/incidents",
    request_body(content_type = "multipart/form-data", description = "The incident report."),
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Makes a retried submission return the first result.")
    ),
    responses(
        (status = 201, description = "Incident created", body = IncidentResponse),
        (status = 400, description = "Invalid report", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 502, description = "Photo could not be stored", body = ErrorBody)
    )
)]
pub async fn create_incident_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut draft = read_incident_form(&mut multipart).await?;
    draft.idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|v| {
            v.to_str()
                .map(str::to_string)
                .map_err(|_| ApiError::invalid("Idempotency-Key must be visible ASCII"))
        })
        .transpose()?;

    let incident = state.service.create_incident(&principal, draft).await?;
    Ok((StatusCode::CREATED, Json(IncidentResponse::from(incident))))
}

/// List incidents, newest first.
#[utoipa::path(
    get,
    path = "/incidents",
    params(ListIncidentsQuery),
    responses(
        (status = 200, description = "One page of incidents", body = IncidentPageResponse),
        (status = 400, description = "Unknown status filter", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn list_incidents_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListIncidentsQuery>,
) -> Result<Json<IncidentPageResponse>, ApiError> {
    let params = ListParams {
        page: query.page,
        limit: query.limit,
        search: query.search,
        owner_only: query.owner_only,
        status: query.status.filter(|s| !s.trim().is_empty()),
    };
    let page = state.service.list_incidents(&principal, params).await?;
    Ok(Json(page.into()))
}

/// Delete an incident and its comments.
#[utoipa::path(
    delete,
    path = "/incidents/{id}",
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 204, description = "Incident deleted"),
        (status = 403, description = "Neither the reporter nor staff", body = ErrorBody),
        (status = 404, description = "Unknown incident", body = ErrorBody)
    )
)]
pub async fn delete_incident_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(incident_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_incident(&principal, incident_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move an incident to a new status.
#[utoipa::path(
    patch,
    path = "/incidents/{id}/status",
    request_body = UpdateStatusRequest,
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 200, description = "Status updated", body = IncidentResponse),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Caller is not staff", body = ErrorBody),
        (status = 404, description = "Unknown incident", body = ErrorBody)
    )
)]
pub async fn update_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(incident_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<IncidentResponse>, ApiError> {
    let incident = state
        .service
        .update_status(&principal, incident_id, &req.status)
        .await?;
    Ok(Json(incident.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> IncidentForm {
        let mut form = IncidentForm::default();
        for (name, value) in fields {
            form.set_text(name, value.to_string());
        }
        form
    }

    #[test]
    fn maps_form_fields_onto_the_draft() {
        let draft = form(&[
            ("title", "Bus stuck"),
            ("location", "Park Road"),
            ("type", "Breakdown"),
            ("severity", "medium"),
            ("description", "   "),
            ("latitude", "28.61"),
            ("longitude", "77.20"),
            ("formatted_address", "Park Road, Downtown"),
            ("colour", "red"),
        ])
        .finish()
        .unwrap();

        assert_eq!(draft.title, "Bus stuck");
        assert_eq!(draft.address, "Park Road");
        assert_eq!(draft.incident_type, "Breakdown");
        assert_eq!(draft.severity, "medium");
        assert_eq!(draft.description, None);
        assert_eq!(draft.formatted_address.as_deref(), Some("Park Road, Downtown"));
        assert_eq!(draft.coordinates, Some(Coordinates { lat: 28.61, lng: 77.20 }));
    }

    #[test]
    fn coordinates_must_be_paired_numbers() {
        assert!(form(&[("latitude", "1.0")]).finish().is_err());
        assert!(form(&[("latitude", "north"), ("longitude", "2.0")]).finish().is_err());
        assert!(form(&[("latitude", "NaN"), ("longitude", "2.0")]).finish().is_err());
        assert_eq!(form(&[("latitude", ""), ("longitude", " ")]).finish().unwrap().coordinates, None);
    }
}
