//! crates/incident_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the incident core.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the database, the photo store and the geocoding service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Comment, Incident, IncidentFilter, IncidentSlice, IncidentStats, InsertOutcome,
    NewIncident, NewNotification, Notification, Principal, Role, StatusChange, User,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    Duplicate(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn list_users_by_role(&self, role: Role) -> PortResult<Vec<User>>;

    /// Replaces the stored password hash. Returns `false` for an unknown user.
    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<bool>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live session to the principal that owns it.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Principal>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Incidents ---
    /// Writes a new incident. When the reporter already created an incident
    /// with the same idempotency key, that incident is returned instead.
    async fn insert_incident(&self, incident: NewIncident) -> PortResult<InsertOutcome>;

    async fn get_incident(&self, incident_id: Uuid) -> PortResult<Incident>;

    async fn list_incidents(&self, filter: &IncidentFilter) -> PortResult<IncidentSlice>;

    /// Returns `false` when no incident with this id existed.
    async fn delete_incident(&self, incident_id: Uuid) -> PortResult<bool>;

    /// Applies the change in one write and returns the updated incident,
    /// or `None` when the incident does not exist.
    async fn update_incident_status(
        &self,
        incident_id: Uuid,
        change: &StatusChange,
    ) -> PortResult<Option<Incident>>;

    async fn incident_stats(&self, recent_limit: u64) -> PortResult<IncidentStats>;

    // --- Comments ---
    /// Atomically appends to the incident's thread. Returns `false` when the
    /// incident does not exist.
    async fn append_comment(&self, incident_id: Uuid, comment: &Comment) -> PortResult<bool>;

    async fn list_comments(&self, incident_id: Uuid) -> PortResult<Vec<Comment>>;

    // --- Notifications ---
    /// Persists the batch in one write and returns how many rows were stored.
    async fn insert_notifications(&self, batch: &[NewNotification]) -> PortResult<u64>;

    async fn list_notifications_for(&self, recipient_email: &str) -> PortResult<Vec<Notification>>;

    async fn get_notification(&self, notification_id: Uuid) -> PortResult<Notification>;

    /// Returns `false` when no notification matched both id and recipient.
    async fn set_notification_read(
        &self,
        notification_id: Uuid,
        recipient_email: &str,
        read: bool,
    ) -> PortResult<bool>;
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Stores an uploaded photo and returns an opaque URL for it.
    async fn store_photo(
        &self,
        bytes: &[u8],
        content_type: &str,
        file_name: Option<&str>,
    ) -> PortResult<String>;
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Turns coordinates into a best-effort postal address.
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> PortResult<String>;
}
