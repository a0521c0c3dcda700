//! Notification fan-out to officials and the officials' inbox.

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use super::IncidentService;
use crate::domain::{Incident, NewNotification, Notification, Principal, Role};
use crate::error::{IncidentError, IncidentResult};
use crate::policy::{authorize, Action};

/// Builds one unread notification per official for a freshly created incident.
pub fn notifications_for(incident: &Incident, official_emails: &[String]) -> Vec<NewNotification> {
    let created_at = Utc::now();
    let title = format!("New Incident: {}", incident.title);
    let message = format!(
        "{} - {} severity reported at {}",
        incident.incident_type,
        incident.severity.as_str(),
        incident.location.address
    );

    official_emails
        .iter()
        .map(|email| NewNotification {
            title: title.clone(),
            message: message.clone(),
            incident_id: incident.id,
            recipient_email: email.clone(),
            created_at,
        })
        .collect()
}

impl IncidentService {
    /// Notifies every current official about `incident`. Returns the number
    /// of notifications written; failures are logged and yield zero.
    pub(crate) async fn fan_out(&self, incident: &Incident) -> u64 {
        let officials = match self
            .io("list officials", self.db.list_users_by_role(Role::Official))
            .await
        {
            Ok(officials) => officials,
            Err(e) => {
                error!(
                    "Failed to load officials for incident {}: {:?}",
                    incident.id, e
                );
                return 0;
            }
        };
        if officials.is_empty() {
            return 0;
        }

        let emails: Vec<String> = officials.into_iter().map(|o| o.email).collect();
        let batch = notifications_for(incident, &emails);
        match self
            .io("insert notifications", self.db.insert_notifications(&batch))
            .await
        {
            Ok(written) => {
                info!(
                    "Notified {} official(s) about incident {}",
                    written, incident.id
                );
                written
            }
            Err(e) => {
                error!(
                    "Failed to create notifications for incident {}: {:?}",
                    incident.id, e
                );
                0
            }
        }
    }

    /// The caller's notifications, newest first.
    pub async fn list_notifications(
        &self,
        principal: &Principal,
    ) -> IncidentResult<Vec<Notification>> {
        authorize(principal, &Action::ListNotifications)?;
        self.io(
            "list notifications",
            self.db.list_notifications_for(&principal.email),
        )
        .await
    }

    /// Sets the read flag on one of the caller's notifications. Repeating the
    /// call with the same value is a no-op.
    pub async fn mark_notification_read(
        &self,
        principal: &Principal,
        notification_id: Uuid,
        read: bool,
    ) -> IncidentResult<()> {
        authorize(principal, &Action::ListNotifications)?;

        let notification = self
            .io("load notification", self.db.get_notification(notification_id))
            .await?;
        authorize(
            principal,
            &Action::ActOnNotification {
                recipient_email: &notification.recipient_email,
            },
        )?;

        let matched = self
            .io(
                "update notification",
                self.db
                    .set_notification_read(notification_id, &principal.email, read),
            )
            .await?;
        if !matched {
            return Err(IncidentError::not_found(format!(
                "notification {notification_id}"
            )));
        }
        Ok(())
    }
}
