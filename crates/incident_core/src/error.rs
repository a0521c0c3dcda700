//! crates/incident_core/src/error.rs
//!
//! The error type returned by every operation of the incident core.

use crate::ports::PortError;

/// Errors surfaced to callers of [`crate::service::IncidentService`].
///
/// Each variant maps to a stable machine-readable kind (see [`IncidentError::kind`]);
/// the `Display` output is the human-readable message.
#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Reserved for optimistic-lock failures; nothing raises it today.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external collaborator failed and the operation could not absorb it.
    #[error("Dependency failure: {0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IncidentError {
    pub fn kind(&self) -> &'static str {
        match self {
            IncidentError::Unauthenticated => "unauthenticated",
            IncidentError::Forbidden(_) => "forbidden",
            IncidentError::NotFound(_) => "not_found",
            IncidentError::InvalidArgument(_) => "invalid_argument",
            IncidentError::Conflict(_) => "conflict",
            IncidentError::Dependency(_) => "dependency",
            IncidentError::Internal(_) => "internal",
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        IncidentError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        IncidentError::NotFound(message.into())
    }
}

impl From<PortError> for IncidentError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => IncidentError::NotFound(what),
            PortError::Duplicate(what) => {
                IncidentError::InvalidArgument(format!("{what} already exists"))
            }
            PortError::Unauthorized => IncidentError::Unauthenticated,
            PortError::Unexpected(msg) => IncidentError::Internal(msg),
        }
    }
}

/// A convenience type alias for `Result<T, IncidentError>`.
pub type IncidentResult<T> = Result<T, IncidentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_stable_kinds() {
        let cases = [
            (PortError::NotFound("incident".into()), "not_found"),
            (PortError::Duplicate("user".into()), "invalid_argument"),
            (PortError::Unauthorized, "unauthenticated"),
            (PortError::Unexpected("pool closed".into()), "internal"),
        ];
        for (port, kind) in cases {
            assert_eq!(IncidentError::from(port).kind(), kind);
        }
    }

    #[test]
    fn message_is_human_readable() {
        let err = IncidentError::invalid("comment content is empty");
        assert_eq!(err.to_string(), "Invalid argument: comment content is empty");
    }
}
