//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered to HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use incident_core::ports::PortError;
use incident_core::IncidentError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error returned by the incident core.
    #[error(transparent)]
    Incident(#[from] IncidentError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        ApiError::Incident(err.into())
    }
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Incident(IncidentError::invalid(message))
    }
}

/// The JSON body sent with every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable error kind.
    pub kind: String,
    pub message: String,
}

fn status_for(err: &IncidentError) -> StatusCode {
    match err {
        IncidentError::Unauthenticated => StatusCode::UNAUTHORIZED,
        IncidentError::Forbidden(_) => StatusCode::FORBIDDEN,
        IncidentError::NotFound(_) => StatusCode::NOT_FOUND,
        IncidentError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        IncidentError::Conflict(_) => StatusCode::CONFLICT,
        IncidentError::Dependency(_) => StatusCode::BAD_GATEWAY,
        IncidentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Incident(err) => {
                let status = status_for(err);
                if status.is_server_error() {
                    error!("Request failed: {:?}", err);
                }
                (
                    status,
                    ErrorBody {
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    },
                )
            }
            other => {
                // Infrastructure details stay in the logs.
                error!("Request failed: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        kind: "internal".to_string(),
                        message: "Internal server error".to_string(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
