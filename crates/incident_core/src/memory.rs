//! crates/incident_core/src/memory.rs
//!
//! An in-process implementation of [`DatabaseService`]. It backs the test
//! suites and local experiments; every method holds a single lock for its
//! whole read-modify-write, so appends and status writes are atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    CategoryCount, Comment, Incident, IncidentFilter, IncidentSlice, IncidentStats,
    IncidentStatus, InsertOutcome, NewIncident, NewNotification, Notification, Principal, Role,
    StatusChange, User, UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};

struct StoredIncident {
    seq: u64,
    incident: Incident,
    idempotency_key: Option<String>,
}

#[derive(Default)]
struct Inner {
    users: Vec<UserCredentials>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    incidents: Vec<StoredIncident>,
    notifications: Vec<Notification>,
    next_seq: u64,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    inner: Mutex<Inner>,
    fail_notification_writes: AtomicBool,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent notification batch write fail.
    pub fn set_fail_notification_writes(&self, fail: bool) {
        self.fail_notification_writes.store(fail, Ordering::SeqCst);
    }

    /// All stored notifications, regardless of recipient.
    pub async fn all_notifications(&self) -> Vec<Notification> {
        self.inner.lock().await.notifications.clone()
    }

    pub async fn incident_count(&self) -> usize {
        self.inner.lock().await.incidents.len()
    }
}

fn matches_filter(incident: &Incident, filter: &IncidentFilter) -> bool {
    if let Some(owner) = &filter.owner_email {
        if !incident.reported_by.email.eq_ignore_ascii_case(owner) {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if incident.status != status {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let hit = incident.title.to_lowercase().contains(&needle)
            || incident
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
            || incident.location.address.to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
    }
    true
}

fn tally<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    out
}

impl Inner {
    /// Incidents matching the filter, newest first.
    fn newest_first(&self, filter: &IncidentFilter) -> Vec<&StoredIncident> {
        let mut hits: Vec<&StoredIncident> = self
            .incidents
            .iter()
            .filter(|s| matches_filter(&s.incident, filter))
            .collect();
        hits.sort_by(|a, b| {
            b.incident
                .created_at
                .cmp(&a.incident.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        hits
    }

    fn incident_mut(&mut self, incident_id: Uuid) -> Option<&mut Incident> {
        self.incidents
            .iter_mut()
            .map(|s| &mut s.incident)
            .find(|i| i.id == incident_id)
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let mut inner = self.inner.lock().await;
        if inner
            .users
            .iter()
            .any(|c| c.user.email.eq_ignore_ascii_case(email))
        {
            return Err(PortError::Duplicate(format!("user {email}")));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role,
        };
        inner.users.push(UserCredentials {
            user: user.clone(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.inner
            .lock()
            .await
            .users
            .iter()
            .find(|c| c.user.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("user {email}")))
    }

    async fn list_users_by_role(&self, role: Role) -> PortResult<Vec<User>> {
        Ok(self
            .inner
            .lock()
            .await
            .users
            .iter()
            .filter(|c| c.user.role == role)
            .map(|c| c.user.clone())
            .collect())
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.users.iter_mut().find(|c| c.user.id == user_id) {
            Some(creds) => {
                creds.hashed_password = hashed_password.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.inner
            .lock()
            .await
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Principal> {
        let inner = self.inner.lock().await;
        let (user_id, expires_at) = inner
            .sessions
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)?;
        if expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        inner
            .users
            .iter()
            .find(|c| c.user.id == user_id)
            .map(|c| Principal::from(c.user.clone()))
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.lock().await.sessions.remove(session_id);
        Ok(())
    }

    async fn insert_incident(&self, incident: NewIncident) -> PortResult<InsertOutcome> {
        let mut inner = self.inner.lock().await;
        if let Some(key) = &incident.idempotency_key {
            if let Some(existing) = inner.incidents.iter().find(|s| {
                s.idempotency_key.as_deref() == Some(key.as_str())
                    && s.incident
                        .reported_by
                        .email
                        .eq_ignore_ascii_case(&incident.reported_by.email)
            }) {
                return Ok(InsertOutcome::Existing(existing.incident.clone()));
            }
        }

        let created = Incident {
            id: Uuid::new_v4(),
            title: incident.title,
            location: incident.location,
            incident_type: incident.incident_type,
            severity: incident.severity,
            status: IncidentStatus::Pending,
            description: incident.description,
            photo_url: incident.photo_url,
            reported_by: incident.reported_by,
            updated_by: None,
            comments: Vec::new(),
            created_at: incident.created_at,
            updated_at: incident.created_at,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.incidents.push(StoredIncident {
            seq,
            incident: created.clone(),
            idempotency_key: incident.idempotency_key,
        });
        Ok(InsertOutcome::Created(created))
    }

    async fn get_incident(&self, incident_id: Uuid) -> PortResult<Incident> {
        self.inner
            .lock()
            .await
            .incidents
            .iter()
            .find(|s| s.incident.id == incident_id)
            .map(|s| s.incident.clone())
            .ok_or_else(|| PortError::NotFound(format!("incident {incident_id}")))
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> PortResult<IncidentSlice> {
        let inner = self.inner.lock().await;
        let hits = inner.newest_first(filter);
        let total = hits.len() as u64;
        let incidents = hits
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .map(|s| s.incident.clone())
            .collect();
        Ok(IncidentSlice { incidents, total })
    }

    async fn delete_incident(&self, incident_id: Uuid) -> PortResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.incidents.len();
        inner.incidents.retain(|s| s.incident.id != incident_id);
        Ok(inner.incidents.len() != before)
    }

    async fn update_incident_status(
        &self,
        incident_id: Uuid,
        change: &StatusChange,
    ) -> PortResult<Option<Incident>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.incident_mut(incident_id).map(|incident| {
            incident.status = change.status;
            incident.updated_by = Some(change.updated_by.clone());
            incident.updated_at = change.updated_at;
            incident.clone()
        }))
    }

    async fn incident_stats(&self, recent_limit: u64) -> PortResult<IncidentStats> {
        let inner = self.inner.lock().await;
        let all = || inner.incidents.iter().map(|s| &s.incident);
        Ok(IncidentStats {
            total_incidents: inner.incidents.len() as u64,
            by_type: tally(all().map(|i| i.incident_type.as_str())),
            by_severity: tally(all().map(|i| i.severity.as_str())),
            by_status: tally(all().map(|i| i.status.as_str())),
            recent_incidents: inner
                .newest_first(&IncidentFilter::default())
                .into_iter()
                .take(recent_limit as usize)
                .map(|s| s.incident.clone())
                .collect(),
        })
    }

    async fn append_comment(&self, incident_id: Uuid, comment: &Comment) -> PortResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.incident_mut(incident_id) {
            Some(incident) => {
                incident.comments.push(comment.clone());
                incident.updated_at = comment.created_at;
                true
            }
            None => false,
        })
    }

    async fn list_comments(&self, incident_id: Uuid) -> PortResult<Vec<Comment>> {
        self.get_incident(incident_id).await.map(|i| i.comments)
    }

    async fn insert_notifications(&self, batch: &[NewNotification]) -> PortResult<u64> {
        if self.fail_notification_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected(
                "notification batch write rejected".to_string(),
            ));
        }
        let mut inner = self.inner.lock().await;
        let mut written = 0;
        for n in batch {
            let duplicate = inner.notifications.iter().any(|existing| {
                existing.incident_id == n.incident_id
                    && existing.recipient_email == n.recipient_email
            });
            if duplicate {
                continue;
            }
            inner.notifications.push(Notification {
                id: Uuid::new_v4(),
                title: n.title.clone(),
                message: n.message.clone(),
                incident_id: n.incident_id,
                recipient_email: n.recipient_email.clone(),
                read: false,
                created_at: n.created_at,
            });
            written += 1;
        }
        Ok(written)
    }

    async fn list_notifications_for(&self, recipient_email: &str) -> PortResult<Vec<Notification>> {
        let inner = self.inner.lock().await;
        let mut mine: Vec<(usize, Notification)> = inner
            .notifications
            .iter()
            .enumerate()
            .filter(|(_, n)| n.recipient_email.eq_ignore_ascii_case(recipient_email))
            .map(|(idx, n)| (idx, n.clone()))
            .collect();
        mine.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then_with(|| ib.cmp(ia)));
        Ok(mine.into_iter().map(|(_, n)| n).collect())
    }

    async fn get_notification(&self, notification_id: Uuid) -> PortResult<Notification> {
        self.inner
            .lock()
            .await
            .notifications
            .iter()
            .find(|n| n.id == notification_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("notification {notification_id}")))
    }

    async fn set_notification_read(
        &self,
        notification_id: Uuid,
        recipient_email: &str,
        read: bool,
    ) -> PortResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.notifications.iter_mut().find(|n| {
            n.id == notification_id && n.recipient_email.eq_ignore_ascii_case(recipient_email)
        }) {
            Some(n) => {
                n.read = read;
                true
            }
            None => false,
        })
    }
}
