//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::web::{analytics, auth, comments, facilities, incidents, notifications};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::change_password_handler,
        incidents::create_incident_handler,
        incidents::list_incidents_handler,
        incidents::delete_incident_handler,
        incidents::update_status_handler,
        comments::add_comment_handler,
        comments::list_comments_handler,
        notifications::list_notifications_handler,
        notifications::mark_notification_handler,
        facilities::facilities_handler,
        analytics::analytics_handler,
    ),
    components(
        schemas(
            ErrorBody,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::ChangePasswordRequest,
            incidents::IncidentResponse,
            incidents::IncidentPageResponse,
            incidents::LocationResponse,
            incidents::CoordinatesResponse,
            incidents::PersonResponse,
            incidents::AuditResponse,
            incidents::UpdateStatusRequest,
            comments::AddCommentRequest,
            comments::CommentResponse,
            notifications::NotificationResponse,
            notifications::MarkReadRequest,
            facilities::FacilitiesResponse,
            facilities::HospitalResponse,
            facilities::OfficialResponse,
            facilities::MedicalCampResponse,
            analytics::StatsResponse,
            analytics::CountResponse,
        )
    ),
    tags(
        (name = "Incident Reporter API", description = "Report transport incidents and coordinate the response.")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/signup",
            "/incidents",
            "/incidents/{id}",
            "/incidents/{id}/status",
            "/incidents/{id}/comments",
            "/notifications",
            "/notifications/{id}",
            "/facilities",
            "/analytics",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
