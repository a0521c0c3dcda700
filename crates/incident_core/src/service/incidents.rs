//! Incident commands and queries: create, list, delete, status, analytics.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::IncidentService;
use crate::domain::{
    Coordinates, Incident, IncidentFilter, IncidentStats, InsertOutcome, Location, NewIncident,
    PersonRef, Principal, Severity,
};
use crate::error::{IncidentError, IncidentResult};
use crate::policy::{authorize, Action};
use crate::query::{normalize_search, IncidentPage, ListParams, PageRequest};

const RECENT_INCIDENTS: u64 = 10;
const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// A photo attached to a new report.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

/// Unvalidated input for creating an incident.
#[derive(Debug, Clone, Default)]
pub struct IncidentDraft {
    pub title: String,
    pub address: String,
    /// Address text produced by a client-side geocoder; overrides `address`.
    pub formatted_address: Option<String>,
    pub incident_type: String,
    pub severity: String,
    pub description: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub photo: Option<PhotoUpload>,
    /// Client-chosen key that makes a retried submission return the first
    /// result instead of creating (and notifying) twice.
    pub idempotency_key: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn coordinate_fallback(coords: Coordinates) -> String {
    format!("Lat: {:.6}, Lng: {:.6}", coords.lat, coords.lng)
}

impl IncidentService {
    /// Validates and writes a new incident, then notifies every official.
    ///
    /// Notification failures are logged and never fail the call: once the
    /// incident is written, creation has succeeded.
    pub async fn create_incident(
        &self,
        principal: &Principal,
        draft: IncidentDraft,
    ) -> IncidentResult<Incident> {
        authorize(principal, &Action::CreateIncident)?;

        let title = non_blank(Some(&draft.title))
            .ok_or_else(|| IncidentError::invalid("title is required"))?;
        let incident_type = non_blank(Some(&draft.incident_type))
            .ok_or_else(|| IncidentError::invalid("incident type is required"))?;
        let severity = Severity::parse(&draft.severity).ok_or_else(|| {
            IncidentError::invalid(format!(
                "invalid severity '{}', expected low, medium, high or critical",
                draft.severity
            ))
        })?;
        if let Some(coords) = draft.coordinates {
            if !coords.is_valid() {
                return Err(IncidentError::invalid("coordinates are out of range"));
            }
        }
        if let Some(photo) = &draft.photo {
            self.validate_photo(photo)?;
        }
        let idempotency_key = non_blank(draft.idempotency_key.as_deref());
        if idempotency_key
            .as_ref()
            .is_some_and(|k| k.len() > MAX_IDEMPOTENCY_KEY_LEN)
        {
            return Err(IncidentError::invalid("idempotency key is too long"));
        }

        let address = match (
            non_blank(draft.formatted_address.as_deref()).or_else(|| non_blank(Some(&draft.address))),
            draft.coordinates,
        ) {
            (Some(address), _) => address,
            (None, Some(coords)) => self.resolve_address(coords).await,
            (None, None) => return Err(IncidentError::invalid("location is required")),
        };

        let photo_url = match &draft.photo {
            Some(photo) => Some(self.store_photo(photo).await?),
            None => None,
        };

        let new_incident = NewIncident {
            title,
            location: Location {
                address,
                coordinates: draft.coordinates,
            },
            incident_type,
            severity,
            description: non_blank(draft.description.as_deref()),
            photo_url,
            reported_by: PersonRef::from(principal),
            idempotency_key,
            created_at: Utc::now(),
        };

        match self
            .io("insert incident", self.db.insert_incident(new_incident))
            .await?
        {
            InsertOutcome::Created(incident) => {
                info!(
                    "Incident {} reported by {} ({} severity)",
                    incident.id,
                    incident.reported_by.email,
                    incident.severity.as_str()
                );
                self.fan_out(&incident).await;
                Ok(incident)
            }
            InsertOutcome::Existing(incident) => {
                info!(
                    "Replayed submission for incident {}; skipping notifications",
                    incident.id
                );
                Ok(incident)
            }
        }
    }

    /// Searches, filters and paginates incidents, newest first.
    pub async fn list_incidents(
        &self,
        principal: &Principal,
        params: ListParams,
    ) -> IncidentResult<IncidentPage> {
        authorize(principal, &Action::ListIncidents)?;

        let status = match non_blank(params.status.as_deref()) {
            Some(raw) => Some(self.settings.status_set.parse(&raw)?),
            None => None,
        };
        let page = PageRequest::new(params.page, params.limit);
        let filter = IncidentFilter {
            search: normalize_search(params.search.as_deref()),
            owner_email: params.owner_only.then(|| principal.email.clone()),
            status,
            offset: page.offset(),
            limit: page.limit,
        };

        let slice = self.io("list incidents", self.db.list_incidents(&filter)).await?;
        Ok(IncidentPage {
            total_pages: page.total_pages(slice.total),
            incidents: slice.incidents,
            total: slice.total,
            page: page.page,
            limit: page.limit,
        })
    }

    /// Deletes an incident. Allowed for its reporter and for officials/admins.
    pub async fn delete_incident(
        &self,
        principal: &Principal,
        incident_id: Uuid,
    ) -> IncidentResult<()> {
        let incident = self
            .io("load incident", self.db.get_incident(incident_id))
            .await?;
        authorize(
            principal,
            &Action::DeleteIncident {
                owner_email: &incident.reported_by.email,
            },
        )?;

        if !self
            .io("delete incident", self.db.delete_incident(incident_id))
            .await?
        {
            return Err(IncidentError::not_found(format!("incident {incident_id}")));
        }
        info!("Incident {} deleted by {}", incident_id, principal.email);
        Ok(())
    }

    /// Writes a new status. The value is validated before authorization, so
    /// a malformed status is always `InvalidArgument`.
    pub async fn update_status(
        &self,
        principal: &Principal,
        incident_id: Uuid,
        requested: &str,
    ) -> IncidentResult<Incident> {
        let status_set = self.settings.status_set;
        let status = status_set.parse(requested)?;
        authorize(principal, &Action::UpdateStatus)?;

        let change = status_set.transition(status, principal);
        let updated = self
            .io(
                "update incident status",
                self.db.update_incident_status(incident_id, &change),
            )
            .await?
            .ok_or_else(|| IncidentError::not_found(format!("incident {incident_id}")))?;

        info!(
            "Incident {} moved to {} by {}",
            incident_id,
            status.as_str(),
            principal.email
        );
        Ok(updated)
    }

    /// Aggregate counts for the analytics dashboard.
    pub async fn incident_stats(&self, principal: &Principal) -> IncidentResult<IncidentStats> {
        authorize(principal, &Action::ViewAnalytics)?;
        self.io("incident stats", self.db.incident_stats(RECENT_INCIDENTS))
            .await
    }

    fn validate_photo(&self, photo: &PhotoUpload) -> IncidentResult<()> {
        if photo.bytes.is_empty() {
            return Err(IncidentError::invalid("photo is empty"));
        }
        if photo.bytes.len() > self.settings.max_photo_bytes {
            return Err(IncidentError::invalid(format!(
                "photo exceeds the {} byte limit",
                self.settings.max_photo_bytes
            )));
        }
        if !photo.content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(IncidentError::invalid(format!(
                "photo must be an image, got '{}'",
                photo.content_type
            )));
        }
        Ok(())
    }

    async fn store_photo(&self, photo: &PhotoUpload) -> IncidentResult<String> {
        let stored = tokio::time::timeout(
            self.settings.io_timeout,
            self.photos
                .store_photo(&photo.bytes, &photo.content_type, photo.file_name.as_deref()),
        )
        .await;
        match stored {
            Ok(Ok(url)) => Ok(url),
            Ok(Err(e)) => {
                warn!("Failed to store photo: {:?}", e);
                Err(IncidentError::Dependency("photo storage failed".to_string()))
            }
            Err(_) => {
                warn!("Photo storage timed out");
                Err(IncidentError::Dependency("photo storage timed out".to_string()))
            }
        }
    }

    /// Reverse-geocodes coordinates, degrading to the raw coordinates when
    /// the lookup fails or takes too long.
    async fn resolve_address(&self, coords: Coordinates) -> String {
        let lookup = tokio::time::timeout(
            self.settings.geocode_timeout,
            self.geocoder.reverse_geocode(coords.lat, coords.lng),
        )
        .await;
        match lookup {
            Ok(Ok(address)) if !address.trim().is_empty() => address.trim().to_string(),
            Ok(Ok(_)) => {
                warn!("Reverse geocoding returned no address for {:?}", coords);
                coordinate_fallback(coords)
            }
            Ok(Err(e)) => {
                warn!("Reverse geocoding failed for {:?}: {:?}", coords, e);
                coordinate_fallback(coords)
            }
            Err(_) => {
                warn!("Reverse geocoding timed out for {:?}", coords);
                coordinate_fallback(coords)
            }
        }
    }
}
