pub mod domain;
pub mod error;
pub mod facilities;
pub mod memory;
pub mod policy;
pub mod ports;
pub mod query;
pub mod service;
pub mod status;

pub use domain::{
    AuditStamp, CategoryCount, Comment, Coordinates, Incident, IncidentStats, IncidentStatus,
    Location, Notification, PersonRef, Principal, Role, Severity, User, UserCredentials,
};
pub use error::{IncidentError, IncidentResult};
pub use ports::{DatabaseService, PhotoStorage, PortError, PortResult, ReverseGeocoder};
pub use service::{IncidentDraft, IncidentService, PhotoUpload, ServiceSettings};
pub use status::StatusSet;
