//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use incident_core::{IncidentError, PortError};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::web::state::AppState;

/// Reads the session id out of the `Cookie` header, if any.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and resolves the principal.
///
/// If valid, inserts the `Principal` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_session_id = session_cookie(req.headers())
        .ok_or(IncidentError::Unauthenticated)?
        .to_string();

    let principal = state
        .store(
            "validate auth session",
            state.db.validate_auth_session(&auth_session_id),
        )
        .await
        .map_err(|e| match e {
            PortError::Unauthorized | PortError::NotFound(_) => {
                debug!("Rejected session: {:?}", e);
                IncidentError::Unauthenticated
            }
            other => {
                error!("Failed to validate auth session: {:?}", other);
                IncidentError::from(other)
            }
        })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
