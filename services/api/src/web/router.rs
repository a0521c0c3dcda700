//! services/api/src/web/router.rs
//!
//! Assembles the Axum router: public auth routes, session-protected incident
//! routes, static photo serving and the Swagger UI.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::adapters::photos::UPLOADS_ROUTE;
use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::{
    analytics::analytics_handler,
    auth::{change_password_handler, login_handler, logout_handler, signup_handler},
    comments::{add_comment_handler, list_comments_handler},
    facilities::facilities_handler,
    incidents::{
        create_incident_handler, delete_incident_handler, list_incidents_handler,
        update_status_handler, IDEMPOTENCY_KEY_HEADER,
    },
    middleware::require_auth,
    notifications::{list_notifications_handler, mark_notification_handler},
    rest::ApiDoc,
    state::AppState,
};

/// Multipart overhead allowed on top of the photo limit.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = state.config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
        ]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/change-password", post(change_password_handler))
        .route(
            "/incidents",
            get(list_incidents_handler).post(create_incident_handler),
        )
        .route("/incidents/{id}", delete(delete_incident_handler))
        .route("/incidents/{id}/status", patch(update_status_handler))
        .route(
            "/incidents/{id}/comments",
            get(list_comments_handler).post(add_comment_handler),
        )
        .route("/notifications", get(list_notifications_handler))
        .route("/notifications/{id}", patch(mark_notification_handler))
        .route("/facilities", get(facilities_handler))
        .route("/analytics", get(analytics_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let body_limit = state.config.max_photo_bytes + FORM_OVERHEAD_BYTES;
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&state.config.upload_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
