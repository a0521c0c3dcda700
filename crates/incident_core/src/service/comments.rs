//! The append-only comment thread attached to each incident.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::IncidentService;
use crate::domain::{Comment, PersonRef, Principal};
use crate::error::{IncidentError, IncidentResult};
use crate::policy::{authorize, Action};

impl IncidentService {
    /// Appends a comment to the incident's thread and returns it.
    pub async fn add_comment(
        &self,
        principal: &Principal,
        incident_id: Uuid,
        content: &str,
    ) -> IncidentResult<Comment> {
        authorize(principal, &Action::AddComment)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(IncidentError::invalid("comment content is required"));
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            content: content.to_string(),
            author: PersonRef::from(principal),
            created_at: Utc::now(),
        };

        let appended = self
            .io("append comment", self.db.append_comment(incident_id, &comment))
            .await?;
        if !appended {
            return Err(IncidentError::not_found(format!("incident {incident_id}")));
        }

        debug!("Comment {} added to incident {}", comment.id, incident_id);
        Ok(comment)
    }

    /// Returns the whole thread in the order it was written.
    pub async fn list_comments(
        &self,
        principal: &Principal,
        incident_id: Uuid,
    ) -> IncidentResult<Vec<Comment>> {
        authorize(principal, &Action::ListComments)?;
        self.io("list comments", self.db.list_comments(incident_id))
            .await
    }
}
