//! crates/incident_core/src/service/mod.rs
//!
//! The incident service: the command and query layer every transport calls.
//! It validates input, consults the authorization policy, talks to the ports
//! under a bounded timeout and triggers notification fan-out on creation.

mod comments;
mod incidents;
mod notifications;

pub use incidents::{IncidentDraft, PhotoUpload};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::Principal;
use crate::error::{IncidentError, IncidentResult};
use crate::facilities::{self, NearbyFacilities};
use crate::policy::{authorize, Action};
use crate::ports::{DatabaseService, PhotoStorage, PortResult, ReverseGeocoder};
use crate::status::StatusSet;

/// Tunables for [`IncidentService`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Upper bound for every store and photo-storage call.
    pub io_timeout: Duration,
    /// Upper bound for a reverse-geocoding lookup before falling back to
    /// the raw coordinates.
    pub geocode_timeout: Duration,
    pub status_set: StatusSet,
    pub max_photo_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(5),
            geocode_timeout: Duration::from_secs(3),
            status_set: StatusSet::Standard,
            max_photo_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Clone)]
pub struct IncidentService {
    db: Arc<dyn DatabaseService>,
    photos: Arc<dyn PhotoStorage>,
    geocoder: Arc<dyn ReverseGeocoder>,
    settings: ServiceSettings,
}

impl IncidentService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        photos: Arc<dyn PhotoStorage>,
        geocoder: Arc<dyn ReverseGeocoder>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            db,
            photos,
            geocoder,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Looks up hospitals, officials and medical camps near a location.
    pub fn lookup_facilities(
        &self,
        principal: &Principal,
        location: &str,
    ) -> IncidentResult<NearbyFacilities> {
        authorize(principal, &Action::LookupFacilities)?;
        facilities::lookup(location)
    }

    /// Runs a port call under the configured I/O timeout.
    async fn io<T, F>(&self, operation: &'static str, call: F) -> IncidentResult<T>
    where
        F: Future<Output = PortResult<T>>,
    {
        match tokio::time::timeout(self.settings.io_timeout, call).await {
            Ok(result) => result.map_err(IncidentError::from),
            Err(_) => {
                warn!("{} timed out after {:?}", operation, self.settings.io_timeout);
                Err(IncidentError::Internal(format!("{operation} timed out")))
            }
        }
    }
}
