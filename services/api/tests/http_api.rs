//! Drives the full router against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use api_lib::adapters::{LocalPhotoStorage, NominatimGeocoder};
use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use incident_core::memory::InMemoryDatabase;
use incident_core::{IncidentService, StatusSet};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use tracing::Level;

const ADMIN_KEY: &str = "letmein";
const BOUNDARY: &str = "incident-form-boundary";

struct TestApp {
    router: Router,
    _uploads: TempDir,
}

async fn app() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: Level::INFO,
        admin_key: Some(ADMIN_KEY.to_string()),
        upload_dir: uploads.path().to_path_buf(),
        max_photo_bytes: 1024,
        // Nothing listens here, so every lookup falls back to coordinates.
        geocoder_url: "http://127.0.0.1:9".to_string(),
        geocode_timeout: Duration::from_millis(200),
        io_timeout: Duration::from_secs(2),
        status_set: StatusSet::Standard,
        cors_origin: "http://localhost:3000".to_string(),
    });

    let db = Arc::new(InMemoryDatabase::default());
    let photos = Arc::new(LocalPhotoStorage::new(config.upload_dir.clone()).await.unwrap());
    let geocoder =
        Arc::new(NominatimGeocoder::new(config.geocoder_url.clone(), config.geocode_timeout).unwrap());
    let service = Arc::new(IncidentService::new(
        db.clone(),
        photos,
        geocoder,
        config.service_settings(),
    ));
    let state = Arc::new(AppState {
        db,
        service,
        config,
    });

    TestApp {
        router: build_router(state).unwrap(),
        _uploads: uploads,
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, cookie, body)
}

fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn incident_form(
    cookie: &str,
    fields: &[(&str, &str)],
    photo: Option<&[u8]>,
    idempotency_key: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = photo {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"scene.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/incidents")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(key) = idempotency_key {
        builder = builder.header("Idempotency-Key", key);
    }
    builder.body(Body::from(body)).unwrap()
}

const ACCIDENT: &[(&str, &str)] = &[
    ("title", "Bus collision"),
    ("location", "12 Main Street, City Center"),
    ("type", "Road Accident"),
    ("severity", "high"),
    ("description", "Two buses at the junction"),
];

async fn signup(app: &TestApp, name: &str, user_type: &str) -> String {
    let (status, cookie, body) = send(
        app,
        json_request(
            Method::POST,
            "/auth/signup",
            None,
            json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "password": "correct-horse",
                "user_type": user_type,
                "admin_key": ADMIN_KEY,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    assert_eq!(body["userType"], user_type);
    cookie.unwrap()
}

async fn create(app: &TestApp, cookie: &str) -> Value {
    let (status, _, body) = send(app, incident_form(cookie, ACCIDENT, None, None)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = app().await;
    let (status, _, body) = send(
        &app,
        Request::builder().uri("/incidents").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");

    let (status, _, _) = send(&app, get("/incidents", "session=forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_and_logout_cycle_the_session() {
    let app = app().await;
    let first = signup(&app, "Asha", "public").await;

    let (status, _, _) = send(
        &app,
        json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "ASHA@example.com", "password": "wrong-pass"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, second, body) = send(
        &app,
        json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "ASHA@example.com", "password": "correct-horse"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "asha@example.com");
    let second = second.unwrap();

    let (status, _, _) = send(
        &app,
        json_request(Method::POST, "/auth/logout", Some(first.as_str()), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, get("/incidents", &first)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(&app, get("/incidents", &second)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_change_needs_the_current_password() {
    let app = app().await;
    let cookie = signup(&app, "Asha", "public").await;
    let change = |current: &str, new: &str| {
        json_request(
            Method::POST,
            "/auth/change-password",
            Some(cookie.as_str()),
            json!({"currentPassword": current, "newPassword": new}),
        )
    };

    let (status, _, _) = send(&app, change("correct-horse", "short")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = send(&app, change("wrong-horse", "battery-staple")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(&app, change("correct-horse", "battery-staple")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(
        &app,
        json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "asha@example.com", "password": "battery-staple"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signup_rules_are_enforced() {
    let app = app().await;
    signup(&app, "Asha", "public").await;

    let (status, _, body) = send(
        &app,
        json_request(
            Method::POST,
            "/auth/signup",
            None,
            json!({"name": "Asha", "email": "asha@example.com", "password": "another-one"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");

    let (status, _, _) = send(
        &app,
        json_request(
            Method::POST,
            "/auth/signup",
            None,
            json!({
                "name": "Mallory",
                "email": "mallory@example.com",
                "password": "long-enough",
                "user_type": "official",
                "admin_key": "guess",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn report_is_triaged_and_officials_are_notified() {
    let app = app().await;
    let official = signup(&app, "Olga", "official").await;
    let reporter = signup(&app, "Ravi", "public").await;

    // Coordinates only: the geocoder is unreachable, so the fallback applies.
    let (status, _, incident) = send(
        &app,
        incident_form(
            &reporter,
            &[
                ("title", "Signal failure"),
                ("type", "Rail"),
                ("severity", "critical"),
                ("latitude", "28.6139"),
                ("longitude", "77.209"),
            ],
            Some(b"\xff\xd8\xff\xe0".as_slice()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{incident}");
    assert_eq!(incident["location"]["address"], "Lat: 28.613900, Lng: 77.209000");
    assert_eq!(incident["status"], "pending");
    assert_eq!(incident["reportedBy"]["email"], "ravi@example.com");
    let id = incident["id"].as_str().unwrap().to_string();

    let photo_url = incident["photoUrl"].as_str().unwrap().to_string();
    assert!(photo_url.starts_with("/uploads/"));
    let (status, _, _) = send(&app, get(&photo_url, &reporter)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, inbox) = send(&app, get("/notifications", &official)).await;
    let inbox = inbox.as_array().unwrap().clone();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["title"], "New Incident: Signal failure");
    assert_eq!(inbox[0]["incidentId"], id.as_str());
    assert_eq!(inbox[0]["read"], false);

    let (status, _, _) = send(&app, get("/notifications", &reporter)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let status_uri = format!("/incidents/{id}/status");
    let (status, _, body) = send(
        &app,
        json_request(Method::PATCH, &status_uri, Some(reporter.as_str()), json!({"status": "resolved"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, _, body) = send(
        &app,
        json_request(Method::PATCH, &status_uri, Some(official.as_str()), json!({"status": "closed"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");

    let (status, _, updated) = send(
        &app,
        json_request(Method::PATCH, &status_uri, Some(official.as_str()), json!({"status": "in_progress"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in_progress");
    assert_eq!(updated["updatedBy"]["email"], "olga@example.com");

    let read_uri = format!("/notifications/{}", inbox[0]["id"].as_str().unwrap());
    for _ in 0..2 {
        let (status, _, _) = send(
            &app,
            json_request(Method::PATCH, &read_uri, Some(official.as_str()), json!({"read": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (_, _, inbox) = send(&app, get("/notifications", &official)).await;
    assert_eq!(inbox[0]["read"], true);
}

#[tokio::test]
async fn mark_read_without_a_read_flag_changes_nothing() {
    let app = app().await;
    let official = signup(&app, "Olga", "official").await;
    let reporter = signup(&app, "Ravi", "public").await;
    create(&app, &reporter).await;

    let (_, _, inbox) = send(&app, get("/notifications", &official)).await;
    let read_uri = format!("/notifications/{}", inbox[0]["id"].as_str().unwrap());
    for body in [json!({}), json!({"read": "yes"}), json!({"read": null})] {
        let (status, _, _) = send(
            &app,
            json_request(Method::PATCH, &read_uri, Some(official.as_str()), body),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    let (_, _, inbox) = send(&app, get("/notifications", &official)).await;
    assert_eq!(inbox[0]["read"], false);
}

#[tokio::test]
async fn replayed_submission_returns_the_first_incident() {
    let app = app().await;
    let official = signup(&app, "Olga", "official").await;
    let reporter = signup(&app, "Ravi", "public").await;

    let (_, _, first) = send(&app, incident_form(&reporter, ACCIDENT, None, Some("retry-1"))).await;
    let (status, _, second) =
        send(&app, incident_form(&reporter, ACCIDENT, None, Some("retry-1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["id"], second["id"]);

    let (_, _, page) = send(&app, get("/incidents", &reporter)).await;
    assert_eq!(page["total"], 1);
    let (_, _, inbox) = send(&app, get("/notifications", &official)).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_or_non_image_photos_are_rejected() {
    let app = app().await;
    let reporter = signup(&app, "Ravi", "public").await;

    let (status, _, body) =
        send(&app, incident_form(&reporter, ACCIDENT, Some([0u8; 2048].as_slice()), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (_, _, page) = send(&app, get("/incidents", &reporter)).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn listing_searches_and_paginates() {
    let app = app().await;
    let reporter = signup(&app, "Ravi", "public").await;
    let other = signup(&app, "Sana", "public").await;
    for _ in 0..3 {
        create(&app, &reporter).await;
    }
    let mut fields = ACCIDENT.to_vec();
    fields[0] = ("title", "Ferry delayed by fog");
    send(&app, incident_form(&other, &fields, None, None)).await;

    let (_, _, page) = send(&app, get("/incidents?page=2&limit=3", &reporter)).await;
    assert_eq!(page["total"], 4);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["incidents"].as_array().unwrap().len(), 1);

    let (_, _, found) = send(&app, get("/incidents?search=FERRY", &reporter)).await;
    assert_eq!(found["total"], 1);
    assert_eq!(found["incidents"][0]["reportedBy"]["email"], "sana@example.com");

    let (_, _, mine) = send(&app, get("/incidents?owner_only=true", &other)).await;
    assert_eq!(mine["total"], 1);
}

#[tokio::test]
async fn comments_and_deletion() {
    let app = app().await;
    let reporter = signup(&app, "Ravi", "public").await;
    let bystander = signup(&app, "Sana", "public").await;
    let incident = create(&app, &reporter).await;
    let id = incident["id"].as_str().unwrap();
    let comments_uri = format!("/incidents/{id}/comments");

    let (status, _, _) = send(
        &app,
        json_request(Method::POST, &comments_uri, Some(bystander.as_str()), json!({"content": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, comment) = send(
        &app,
        json_request(Method::POST, &comments_uri, Some(bystander.as_str()), json!({"content": "Road is blocked"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"]["email"], "sana@example.com");

    let (_, _, thread) = send(&app, get(&comments_uri, &reporter)).await;
    assert_eq!(thread.as_array().unwrap().len(), 1);

    let delete = |cookie: &str| {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/incidents/{id}"))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };
    let (status, _, _) = send(&app, delete(&bystander)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(&app, delete(&reporter)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = send(&app, get(&comments_uri, &reporter)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn facilities_and_analytics() {
    let app = app().await;
    let official = signup(&app, "Olga", "official").await;
    let reporter = signup(&app, "Ravi", "public").await;
    create(&app, &reporter).await;

    let (status, _, found) = send(&app, get("/facilities?location=Business%20Park%20Road", &reporter)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["area"], "downtown");

    let (status, _, everything) = send(&app, get("/facilities?location=7%20Random%20Alley", &reporter)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(everything["hospitals"].as_array().unwrap().len(), 3);

    let (status, _, _) = send(&app, get("/facilities", &reporter)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, get("/analytics", &reporter)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, stats) = send(&app, get("/analytics", &official)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalIncidents"], 1);
    assert_eq!(stats["bySeverity"][0], json!({"label": "high", "count": 1}));
    assert_eq!(stats["recentIncidents"].as_array().unwrap().len(), 1);
}
