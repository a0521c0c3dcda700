//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the core crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use incident_core::domain::{
    AuditStamp, CategoryCount, Comment, Coordinates, Incident, IncidentFilter, IncidentSlice,
    IncidentStats, IncidentStatus, InsertOutcome, Location, NewIncident, NewNotification,
    Notification, PersonRef, Principal, Role, Severity, StatusChange, User, UserCredentials,
};
use incident_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Loads the comment threads for a set of incidents, in append order.
    async fn comments_for(&self, incident_ids: &[Uuid]) -> PortResult<HashMap<Uuid, Vec<Comment>>> {
        if incident_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM incident_comments WHERE incident_id = ANY($1) ORDER BY seq ASC"
        ))
        .bind(incident_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut threads: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for record in records {
            let (incident_id, comment) = record.to_domain();
            threads.entry(incident_id).or_default().push(comment);
        }
        Ok(threads)
    }

    async fn hydrate(&self, records: Vec<IncidentRecord>) -> PortResult<Vec<Incident>> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut threads = self.comments_for(&ids).await?;
        records
            .into_iter()
            .map(|r| {
                let comments = threads.remove(&r.id).unwrap_or_default();
                r.to_domain(comments)
            })
            .collect()
    }

    async fn count_by(&self, column: &'static str) -> PortResult<Vec<CategoryCount>> {
        let records = sqlx::query_as::<_, CountRecord>(&format!(
            "SELECT {column} AS label, COUNT(*) AS count FROM incidents GROUP BY {column} ORDER BY count DESC, label ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CountRecord::to_domain).collect())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Escapes LIKE wildcards so search text is matched literally.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &IncidentFilter) {
    qb.push(" WHERE TRUE");
    if let Some(owner) = &filter.owner_email {
        qb.push(" AND LOWER(reported_by_email) = LOWER(")
            .push_bind(owner.clone())
            .push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR address ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const INCIDENT_COLUMNS: &str = "id, title, address, lat, lng, incident_type, severity, status, \
     description, photo_url, reported_by_id, reported_by_name, reported_by_email, \
     updated_by_name, updated_by_email, created_at, updated_at";

const COMMENT_COLUMNS: &str =
    "id, incident_id, content, author_id, author_name, author_email, created_at";

const NOTIFICATION_COLUMNS: &str =
    "id, title, message, incident_id, recipient_email, read, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            PortError::Unexpected(format!("user {} has unknown role '{}'", self.id, self.role))
        })?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        let user = UserRecord {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
        }
        .to_domain()?;
        Ok(UserCredentials {
            user,
            hashed_password: self.hashed_password,
        })
    }
}

#[derive(FromRow)]
struct IncidentRecord {
    id: Uuid,
    title: String,
    address: String,
    lat: Option<f64>,
    lng: Option<f64>,
    incident_type: String,
    severity: String,
    status: String,
    description: Option<String>,
    photo_url: Option<String>,
    reported_by_id: Uuid,
    reported_by_name: String,
    reported_by_email: String,
    updated_by_name: Option<String>,
    updated_by_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl IncidentRecord {
    fn to_domain(self, comments: Vec<Comment>) -> PortResult<Incident> {
        let severity = Severity::parse(&self.severity).ok_or_else(|| {
            PortError::Unexpected(format!("incident {} has severity '{}'", self.id, self.severity))
        })?;
        let status = IncidentStatus::from_canonical(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("incident {} has status '{}'", self.id, self.status))
        })?;
        let coordinates = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };
        let updated_by = match (self.updated_by_name, self.updated_by_email) {
            (Some(name), Some(email)) => Some(AuditStamp { name, email }),
            _ => None,
        };
        Ok(Incident {
            id: self.id,
            title: self.title,
            location: Location {
                address: self.address,
                coordinates,
            },
            incident_type: self.incident_type,
            severity,
            status,
            description: self.description,
            photo_url: self.photo_url,
            reported_by: PersonRef {
                id: self.reported_by_id,
                name: self.reported_by_name,
                email: self.reported_by_email,
            },
            updated_by,
            comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CommentRecord {
    id: Uuid,
    incident_id: Uuid,
    content: String,
    author_id: Uuid,
    author_name: String,
    author_email: String,
    created_at: DateTime<Utc>,
}
impl CommentRecord {
    fn to_domain(self) -> (Uuid, Comment) {
        (
            self.incident_id,
            Comment {
                id: self.id,
                content: self.content,
                author: PersonRef {
                    id: self.author_id,
                    name: self.author_name,
                    email: self.author_email,
                },
                created_at: self.created_at,
            },
        )
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    title: String,
    message: String,
    incident_id: Uuid,
    recipient_email: String,
    read: bool,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> Notification {
        Notification {
            id: self.id,
            title: self.title,
            message: self.message,
            incident_id: self.incident_id,
            recipient_email: self.recipient_email,
            read: self.read,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CountRecord {
    label: String,
    count: i64,
}
impl CountRecord {
    fn to_domain(self) -> CategoryCount {
        CategoryCount {
            label: self.label,
            count: self.count.max(0) as u64,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, name, email, hashed_password, role) VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, email, role",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Duplicate(format!("user {email}"))
            }
            other => unexpected(other),
        })?;
        record.to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, name, email, role, hashed_password FROM users WHERE email = LOWER($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn list_users_by_role(&self, role: Role) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, role FROM users WHERE role = $1 ORDER BY created_at ASC",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(UserRecord::to_domain).collect()
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<bool> {
        let result = sqlx::query("UPDATE users SET hashed_password = $1 WHERE id = $2")
            .bind(hashed_password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Principal> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.id, u.name, u.email, u.role FROM auth_sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;
        Ok(record.to_domain()?.into())
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn insert_incident(&self, incident: NewIncident) -> PortResult<InsertOutcome> {
        let inserted = sqlx::query_as::<_, IncidentRecord>(&format!(
            "INSERT INTO incidents (id, title, address, lat, lng, incident_type, severity, status, \
             description, photo_url, reported_by_id, reported_by_name, reported_by_email, \
             idempotency_key, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9, $10, $11, $12, $13, $14, $14) \
             ON CONFLICT (reported_by_email, idempotency_key) DO NOTHING \
             RETURNING {INCIDENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&incident.title)
        .bind(&incident.location.address)
        .bind(incident.location.coordinates.map(|c| c.lat))
        .bind(incident.location.coordinates.map(|c| c.lng))
        .bind(&incident.incident_type)
        .bind(incident.severity.as_str())
        .bind(&incident.description)
        .bind(&incident.photo_url)
        .bind(incident.reported_by.id)
        .bind(&incident.reported_by.name)
        .bind(&incident.reported_by.email)
        .bind(&incident.idempotency_key)
        .bind(incident.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        if let Some(record) = inserted {
            return Ok(InsertOutcome::Created(record.to_domain(Vec::new())?));
        }

        // Only a repeated (reporter, idempotency key) pair can conflict.
        let existing = sqlx::query_as::<_, IncidentRecord>(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents \
             WHERE reported_by_email = $1 AND idempotency_key = $2"
        ))
        .bind(&incident.reported_by.email)
        .bind(&incident.idempotency_key)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        let mut hydrated = self.hydrate(vec![existing]).await?;
        hydrated
            .pop()
            .map(InsertOutcome::Existing)
            .ok_or_else(|| PortError::Unexpected("replayed incident vanished".to_string()))
    }

    async fn get_incident(&self, incident_id: Uuid) -> PortResult<Incident> {
        let record = sqlx::query_as::<_, IncidentRecord>(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1"
        ))
        .bind(incident_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Incident {} not found", incident_id))
            }
            _ => unexpected(e),
        })?;
        let mut hydrated = self.hydrate(vec![record]).await?;
        hydrated
            .pop()
            .ok_or_else(|| PortError::NotFound(format!("Incident {} not found", incident_id)))
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> PortResult<IncidentSlice> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM incidents");
        push_filter(&mut count_qb, filter);

        let mut page_qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {INCIDENT_COLUMNS} FROM incidents"));
        push_filter(&mut page_qb, filter);
        page_qb
            .push(" ORDER BY created_at DESC, seq DESC LIMIT ")
            .push_bind(i64::try_from(filter.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(filter.offset).unwrap_or(i64::MAX));

        let (total, records) = futures::try_join!(
            count_qb.build_query_scalar::<i64>().fetch_one(&self.pool),
            page_qb
                .build_query_as::<IncidentRecord>()
                .fetch_all(&self.pool),
        )
        .map_err(unexpected)?;

        Ok(IncidentSlice {
            incidents: self.hydrate(records).await?,
            total: total.max(0) as u64,
        })
    }

    async fn delete_incident(&self, incident_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = $1")
            .bind(incident_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_incident_status(
        &self,
        incident_id: Uuid,
        change: &StatusChange,
    ) -> PortResult<Option<Incident>> {
        let record = sqlx::query_as::<_, IncidentRecord>(&format!(
            "UPDATE incidents SET status = $1, updated_by_name = $2, updated_by_email = $3, \
             updated_at = $4 WHERE id = $5 RETURNING {INCIDENT_COLUMNS}"
        ))
        .bind(change.status.as_str())
        .bind(&change.updated_by.name)
        .bind(&change.updated_by.email)
        .bind(change.updated_at)
        .bind(incident_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => Ok(self.hydrate(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn incident_stats(&self, recent_limit: u64) -> PortResult<IncidentStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM incidents")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        let (by_type, by_severity, by_status) = futures::try_join!(
            self.count_by("incident_type"),
            self.count_by("severity"),
            self.count_by("status"),
        )?;
        let recent = self
            .list_incidents(&IncidentFilter {
                limit: recent_limit,
                ..IncidentFilter::default()
            })
            .await?;

        Ok(IncidentStats {
            total_incidents: total.max(0) as u64,
            by_type,
            by_severity,
            by_status,
            recent_incidents: recent.incidents,
        })
    }

    async fn append_comment(&self, incident_id: Uuid, comment: &Comment) -> PortResult<bool> {
        // One statement: touch the incident and append only if it exists.
        let result = sqlx::query(
            "WITH touched AS ( \
                 UPDATE incidents SET updated_at = $7 WHERE id = $2 RETURNING id \
             ) \
             INSERT INTO incident_comments \
                 (id, incident_id, content, author_id, author_name, author_email, created_at) \
             SELECT $1, touched.id, $3, $4, $5, $6, $7 FROM touched",
        )
        .bind(comment.id)
        .bind(incident_id)
        .bind(&comment.content)
        .bind(comment.author.id)
        .bind(&comment.author.name)
        .bind(&comment.author.email)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_comments(&self, incident_id: Uuid) -> PortResult<Vec<Comment>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM incidents WHERE id = $1)")
            .bind(incident_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        if !exists {
            return Err(PortError::NotFound(format!("Incident {} not found", incident_id)));
        }
        Ok(self
            .comments_for(&[incident_id])
            .await?
            .remove(&incident_id)
            .unwrap_or_default())
    }

    async fn insert_notifications(&self, batch: &[NewNotification]) -> PortResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = batch.iter().map(|_| Uuid::new_v4()).collect();
        let titles: Vec<String> = batch.iter().map(|n| n.title.clone()).collect();
        let messages: Vec<String> = batch.iter().map(|n| n.message.clone()).collect();
        let incident_ids: Vec<Uuid> = batch.iter().map(|n| n.incident_id).collect();
        let recipients: Vec<String> = batch.iter().map(|n| n.recipient_email.clone()).collect();
        let created: Vec<DateTime<Utc>> = batch.iter().map(|n| n.created_at).collect();

        let result = sqlx::query(
            "INSERT INTO notifications (id, title, message, incident_id, recipient_email, created_at) \
             SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::text[], $4::uuid[], $5::text[], $6::timestamptz[]) \
             ON CONFLICT (incident_id, recipient_email) DO NOTHING",
        )
        .bind(ids)
        .bind(titles)
        .bind(messages)
        .bind(incident_ids)
        .bind(recipients)
        .bind(created)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn list_notifications_for(&self, recipient_email: &str) -> PortResult<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE LOWER(recipient_email) = LOWER($1) ORDER BY created_at DESC"
        ))
        .bind(recipient_email)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(NotificationRecord::to_domain).collect())
    }

    async fn get_notification(&self, notification_id: Uuid) -> PortResult<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(notification_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Notification {} not found", notification_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn set_notification_read(
        &self,
        notification_id: Uuid,
        recipient_email: &str,
        read: bool,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET read = $1 WHERE id = $2 AND LOWER(recipient_email) = LOWER($3)",
        )
        .bind(read)
        .bind(notification_id)
        .bind(recipient_email)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bus"), "%bus%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn filter_clauses_follow_the_filter() {
        let filter = IncidentFilter {
            search: Some("tram".to_string()),
            owner_email: Some("a@example.com".to_string()),
            status: Some(IncidentStatus::Resolved),
            offset: 0,
            limit: 10,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM incidents");
        push_filter(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("LOWER(reported_by_email) = LOWER($1)"));
        assert!(sql.contains("status = $2"));
        assert!(sql.contains("title ILIKE $3 OR description ILIKE $4 OR address ILIKE $5"));
    }
}
