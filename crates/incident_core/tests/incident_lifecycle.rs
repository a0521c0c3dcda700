mod common;

use common::{draft, harness, harness_with, user, StubGeocoder};
use incident_core::{Coordinates, IncidentStatus, PhotoUpload, Role, Severity};
use uuid::Uuid;

#[tokio::test]
async fn create_incident_snapshots_reporter_and_starts_pending() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;

    let incident = h
        .service
        .create_incident(&alice, draft("Bus collision"))
        .await
        .expect("create");

    assert_eq!(incident.status, IncidentStatus::Pending);
    assert_eq!(incident.severity, Severity::High);
    assert_eq!(incident.reported_by.email, alice.email);
    assert_eq!(incident.reported_by.id, alice.id);
    assert!(incident.comments.is_empty());
    assert_eq!(incident.created_at, incident.updated_at);
}

#[tokio::test]
async fn create_incident_rejects_missing_fields_without_writing() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;

    let no_title = draft("   ");
    let mut bad_severity = draft("Pothole");
    bad_severity.severity = "apocalyptic".to_string();
    let mut no_location = draft("Signal failure");
    no_location.address = String::new();
    let mut bad_coords = draft("Signal failure");
    bad_coords.coordinates = Some(Coordinates { lat: 91.0, lng: 0.0 });

    for bad in [no_title, bad_severity, no_location, bad_coords] {
        let err = h.service.create_incident(&alice, bad).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
    assert_eq!(h.db.incident_count().await, 0);
}

#[tokio::test]
async fn photo_is_validated_then_stored_once() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;

    let mut not_image = draft("Broken rail");
    not_image.photo = Some(PhotoUpload {
        bytes: b"%PDF-1.4".to_vec(),
        content_type: "application/pdf".to_string(),
        file_name: Some("report.pdf".to_string()),
    });
    let err = h.service.create_incident(&alice, not_image).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");

    let mut too_big = draft("Broken rail");
    too_big.photo = Some(PhotoUpload {
        bytes: vec![0u8; h.service.settings().max_photo_bytes + 1],
        content_type: "image/jpeg".to_string(),
        file_name: None,
    });
    let err = h.service.create_incident(&alice, too_big).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");

    let mut ok = draft("Broken rail");
    ok.photo = Some(PhotoUpload {
        bytes: vec![0xFF, 0xD8, 0xFF],
        content_type: "image/jpeg".to_string(),
        file_name: Some("rail.jpg".to_string()),
    });
    let incident = h.service.create_incident(&alice, ok).await.expect("create");
    assert_eq!(incident.photo_url.as_deref(), Some("/uploads/photo-0.jpg"));
    assert_eq!(h.db.incident_count().await, 1);
}

#[tokio::test]
async fn photo_storage_failure_is_a_dependency_error_and_writes_nothing() {
    let h = harness_with(StubGeocoder::Fails, true);
    let alice = user(&h.db, "Alice", Role::Public).await;

    let mut with_photo = draft("Ferry delay");
    with_photo.photo = Some(PhotoUpload {
        bytes: vec![1, 2, 3],
        content_type: "image/png".to_string(),
        file_name: None,
    });
    let err = h.service.create_incident(&alice, with_photo).await.unwrap_err();
    assert_eq!(err.kind(), "dependency");
    assert_eq!(h.db.incident_count().await, 0);
}

#[tokio::test]
async fn coordinates_alone_are_reverse_geocoded() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;

    let mut by_gps = draft("Overturned truck");
    by_gps.address = String::new();
    by_gps.coordinates = Some(Coordinates { lat: 12.5, lng: 77.25 });

    let incident = h.service.create_incident(&alice, by_gps).await.expect("create");
    assert_eq!(incident.location.address, "1 Station Road, City Center");
    assert_eq!(
        incident.location.coordinates,
        Some(Coordinates { lat: 12.5, lng: 77.25 })
    );
}

#[tokio::test]
async fn geocoding_failure_or_stall_falls_back_to_coordinates() {
    for geocoder in [StubGeocoder::Fails, StubGeocoder::Hangs] {
        let h = harness_with(geocoder, false);
        let alice = user(&h.db, "Alice", Role::Public).await;

        let mut by_gps = draft("Overturned truck");
        by_gps.address = String::new();
        by_gps.coordinates = Some(Coordinates { lat: 12.5, lng: 77.25 });

        let incident = h.service.create_incident(&alice, by_gps).await.expect("create");
        assert_eq!(incident.location.address, "Lat: 12.500000, Lng: 77.250000");
    }
}

#[tokio::test]
async fn formatted_address_overrides_typed_address() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;

    let mut d = draft("Tram stuck");
    d.formatted_address = Some("Lake View Road, Suburb".to_string());
    let incident = h.service.create_incident(&alice, d).await.expect("create");
    assert_eq!(incident.location.address, "Lake View Road, Suburb");
}

#[tokio::test]
async fn public_owner_can_never_update_status() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;
    let incident = h
        .service
        .create_incident(&alice, draft("Bus collision"))
        .await
        .unwrap();

    for status in ["pending", "in_progress", "resolved"] {
        let err = h
            .service
            .update_status(&alice, incident.id, status)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }
}

#[tokio::test]
async fn malformed_status_is_invalid_before_authorization() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;
    let incident = h
        .service
        .create_incident(&alice, draft("Bus collision"))
        .await
        .unwrap();

    let err = h
        .service
        .update_status(&alice, incident.id, "rejected")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");
}

#[tokio::test]
async fn officials_move_status_freely_and_are_recorded() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;
    let olga = user(&h.db, "Olga", Role::Official).await;
    let adam = user(&h.db, "Adam", Role::Admin).await;
    let incident = h
        .service
        .create_incident(&alice, draft("Bus collision"))
        .await
        .unwrap();

    // Straight to resolved, then reopened: no forbidden edges.
    let resolved = h
        .service
        .update_status(&olga, incident.id, "resolved")
        .await
        .expect("resolve");
    assert_eq!(resolved.status, IncidentStatus::Resolved);
    assert_eq!(resolved.updated_by.as_ref().unwrap().email, olga.email);
    assert!(resolved.updated_at >= incident.updated_at);

    let reopened = h
        .service
        .update_status(&adam, incident.id, "pending")
        .await
        .expect("reopen");
    assert_eq!(reopened.status, IncidentStatus::Pending);
    assert_eq!(reopened.updated_by.unwrap().name, "Adam");

    let err = h
        .service
        .update_status(&olga, Uuid::new_v4(), "resolved")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn delete_is_limited_to_owner_and_staff() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;
    let bob = user(&h.db, "Bob", Role::Public).await;
    let olga = user(&h.db, "Olga", Role::Official).await;
    let adam = user(&h.db, "Adam", Role::Admin).await;

    let first = h.service.create_incident(&alice, draft("One")).await.unwrap();
    let second = h.service.create_incident(&alice, draft("Two")).await.unwrap();
    let third = h.service.create_incident(&alice, draft("Three")).await.unwrap();

    let err = h.service.delete_incident(&bob, first.id).await.unwrap_err();
    assert_eq!(err.kind(), "forbidden");
    assert_eq!(h.db.incident_count().await, 3);

    h.service.delete_incident(&alice, first.id).await.expect("owner");
    h.service.delete_incident(&olga, second.id).await.expect("official");
    h.service.delete_incident(&adam, third.id).await.expect("admin");
    assert_eq!(h.db.incident_count().await, 0);

    let err = h.service.delete_incident(&alice, first.id).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn analytics_are_for_staff_only() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;
    let olga = user(&h.db, "Olga", Role::Official).await;

    h.service.create_incident(&alice, draft("One")).await.unwrap();
    let mut low = draft("Two");
    low.severity = "low".to_string();
    h.service.create_incident(&alice, low).await.unwrap();

    let err = h.service.incident_stats(&alice).await.unwrap_err();
    assert_eq!(err.kind(), "forbidden");

    let stats = h.service.incident_stats(&olga).await.expect("stats");
    assert_eq!(stats.total_incidents, 2);
    assert_eq!(stats.by_type[0].label, "Road Accident");
    assert_eq!(stats.by_type[0].count, 2);
    assert_eq!(stats.by_severity.len(), 2);
    assert_eq!(stats.by_status[0].label, "pending");
    assert_eq!(stats.recent_incidents[0].title, "Two");
}

#[tokio::test]
async fn facility_lookup_goes_through_the_service() {
    let h = harness();
    let alice = user(&h.db, "Alice", Role::Public).await;

    let nearby = h
        .service
        .lookup_facilities(&alice, "123 Main Street, City Center")
        .expect("lookup");
    assert_eq!(nearby.area.label(), "city center");
    assert_eq!(nearby.hospitals[0].hospital.name, "City General Hospital");
}
