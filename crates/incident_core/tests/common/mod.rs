#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use incident_core::memory::InMemoryDatabase;
use incident_core::{
    DatabaseService, IncidentDraft, IncidentService, PhotoStorage, PortError, PortResult,
    Principal, ReverseGeocoder, Role, ServiceSettings,
};

pub struct StubPhotos {
    pub fail: bool,
    pub stored: AtomicUsize,
}

#[async_trait]
impl PhotoStorage for StubPhotos {
    async fn store_photo(
        &self,
        _bytes: &[u8],
        _content_type: &str,
        _file_name: Option<&str>,
    ) -> PortResult<String> {
        if self.fail {
            return Err(PortError::Unexpected("disk full".to_string()));
        }
        let n = self.stored.fetch_add(1, Ordering::SeqCst);
        Ok(format!("/uploads/photo-{n}.jpg"))
    }
}

pub enum StubGeocoder {
    Address(&'static str),
    Fails,
    Hangs,
}

#[async_trait]
impl ReverseGeocoder for StubGeocoder {
    async fn reverse_geocode(&self, _lat: f64, _lng: f64) -> PortResult<String> {
        match self {
            StubGeocoder::Address(a) => Ok(a.to_string()),
            StubGeocoder::Fails => Err(PortError::Unexpected("503 from geocoder".to_string())),
            StubGeocoder::Hangs => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("too late".to_string())
            }
        }
    }
}

pub struct Harness {
    pub db: Arc<InMemoryDatabase>,
    pub photos: Arc<StubPhotos>,
    pub service: IncidentService,
}

pub fn harness() -> Harness {
    harness_with(StubGeocoder::Address("1 Station Road, City Center"), false)
}

pub fn harness_with(geocoder: StubGeocoder, photos_fail: bool) -> Harness {
    let db = Arc::new(InMemoryDatabase::new());
    let photos = Arc::new(StubPhotos {
        fail: photos_fail,
        stored: AtomicUsize::new(0),
    });
    let settings = ServiceSettings {
        io_timeout: Duration::from_secs(2),
        geocode_timeout: Duration::from_millis(50),
        ..ServiceSettings::default()
    };
    let service = IncidentService::new(
        db.clone(),
        photos.clone(),
        Arc::new(geocoder),
        settings,
    );
    Harness { db, photos, service }
}

pub async fn user(db: &InMemoryDatabase, name: &str, role: Role) -> Principal {
    let email = format!("{}@example.com", name.to_lowercase());
    db.create_user(name, &email, "hash", role)
        .await
        .expect("create user")
        .into()
}

pub fn draft(title: &str) -> IncidentDraft {
    IncidentDraft {
        title: title.to_string(),
        address: "42 Main Street, City Center".to_string(),
        incident_type: "Road Accident".to_string(),
        severity: "high".to_string(),
        description: Some("Two buses collided at the junction".to_string()),
        ..IncidentDraft::default()
    }
}
