//! crates/incident_core/src/domain.rs
//!
//! Defines the pure, core data structures for the incident reporter.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Principals and Users
//=========================================================================================

/// The role a user holds. Drives every authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Public,
    Official,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Public => "public",
            Role::Official => "official",
            Role::Admin => "admin",
        }
    }

    /// Parses a stored role string. Older accounts were created with `user`,
    /// which means the same thing as `public`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "public" | "user" => Some(Role::Public),
            "official" => Some(Role::Official),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Official | Role::Admin)
    }
}

/// The authenticated actor issuing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

// Represents a user - read by the core for notification targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

//=========================================================================================
// Incidents
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// Lifecycle status of an incident. `Rejected` only exists when the
/// deployment opts into it, see [`crate::status::StatusSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncidentStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Rejected => "rejected",
        }
    }

    /// Maps a canonical status string back to a variant, without checking it
    /// against the configured status set.
    pub fn from_canonical(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(IncidentStatus::Pending),
            "in_progress" => Some(IncidentStatus::InProgress),
            "resolved" => Some(IncidentStatus::Resolved),
            "rejected" => Some(IncidentStatus::Rejected),
            _ => None,
        }
    }
}

/// Immutable snapshot of a person at the time they acted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&Principal> for PersonRef {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            name: principal.name.clone(),
            email: principal.email.clone(),
        }
    }
}

/// Who performed the last status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp {
    pub name: String,
    pub email: String,
}

/// A single entry in an incident's append-only comment thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author: PersonRef,
    pub created_at: DateTime<Utc>,
}

/// The central aggregate: a reported transport incident.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub id: Uuid,
    pub title: String,
    pub location: Location,
    pub incident_type: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub reported_by: PersonRef,
    pub updated_by: Option<AuditStamp>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated incident ready to be written. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub title: String,
    pub location: Location,
    pub incident_type: String,
    pub severity: Severity,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub reported_by: PersonRef,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of writing a new incident.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// The incident was written by this call.
    Created(Incident),
    /// A previous call with the same reporter and idempotency key already
    /// wrote this incident.
    Existing(Incident),
}

/// A status write, applied atomically by the store.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: IncidentStatus,
    pub updated_by: AuditStamp,
    pub updated_at: DateTime<Utc>,
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub incident_id: Uuid,
    pub recipient_email: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub incident_id: Uuid,
    pub recipient_email: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Queries and Analytics
//=========================================================================================

/// A store-level incident query. Offsets and limits are already clamped.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub search: Option<String>,
    pub owner_email: Option<String>,
    pub status: Option<IncidentStatus>,
    pub offset: u64,
    pub limit: u64,
}

/// One page of incidents plus the total number matching the filter.
#[derive(Debug, Clone)]
pub struct IncidentSlice {
    pub incidents: Vec<Incident>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
}

/// Aggregate view of the incident store for officials.
#[derive(Debug, Clone)]
pub struct IncidentStats {
    pub total_incidents: u64,
    pub by_type: Vec<CategoryCount>,
    pub by_severity: Vec<CategoryCount>,
    pub by_status: Vec<CategoryCount>,
    pub recent_incidents: Vec<Incident>,
}
