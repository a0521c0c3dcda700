//! crates/incident_core/src/status.rs
//!
//! Incident status rules. Any status in the configured set may be written
//! directly: there are no forbidden edges and `resolved` can be reopened.

use std::str::FromStr;

use chrono::Utc;

use crate::domain::{AuditStamp, IncidentStatus, Principal, StatusChange};
use crate::error::IncidentError;

/// Which status values a deployment accepts.
///
/// One reporting path historically allowed `rejected` while the general
/// update path did not. Until product settles it, the choice is configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusSet {
    /// `pending`, `in_progress`, `resolved`.
    #[default]
    Standard,
    /// The standard set plus `rejected`.
    WithRejected,
}

impl StatusSet {
    pub fn allowed(&self) -> &'static [IncidentStatus] {
        match self {
            StatusSet::Standard => &[
                IncidentStatus::Pending,
                IncidentStatus::InProgress,
                IncidentStatus::Resolved,
            ],
            StatusSet::WithRejected => &[
                IncidentStatus::Pending,
                IncidentStatus::InProgress,
                IncidentStatus::Resolved,
                IncidentStatus::Rejected,
            ],
        }
    }

    pub fn contains(&self, status: IncidentStatus) -> bool {
        self.allowed().contains(&status)
    }

    /// Parses a requested status. Only exact canonical strings are accepted.
    pub fn parse(&self, raw: &str) -> Result<IncidentStatus, IncidentError> {
        IncidentStatus::from_canonical(raw)
            .filter(|status| self.contains(*status))
            .ok_or_else(|| {
                let allowed: Vec<&str> = self.allowed().iter().map(|s| s.as_str()).collect();
                IncidentError::invalid(format!(
                    "invalid status value '{raw}', expected one of: {}",
                    allowed.join(", ")
                ))
            })
    }

    /// Builds the audited write for a transition to `status`.
    pub fn transition(&self, status: IncidentStatus, by: &Principal) -> StatusChange {
        StatusChange {
            status,
            updated_by: AuditStamp {
                name: by.name.clone(),
                email: by.email.clone(),
            },
            updated_at: Utc::now(),
        }
    }
}

impl FromStr for StatusSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(StatusSet::Standard),
            "with_rejected" => Ok(StatusSet::WithRejected),
            other => Err(format!(
                "'{other}' is not a status set (use 'standard' or 'with_rejected')"
            )),
        }
    }
}
