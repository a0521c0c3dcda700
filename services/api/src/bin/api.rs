//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, LocalPhotoStorage, NominatimGeocoder},
    config::Config,
    error::ApiError,
    shutdown::cancel_on_signal,
    web::{build_router, state::AppState},
};
use incident_core::IncidentService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(config.io_timeout)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let photo_storage = Arc::new(LocalPhotoStorage::new(config.upload_dir.clone()).await?);
    let geocoder = Arc::new(
        NominatimGeocoder::new(config.geocoder_url.clone(), config.geocode_timeout)
            .map_err(|e| ApiError::Internal(format!("Failed to build geocoder client: {e}")))?,
    );
    let service = Arc::new(IncidentService::new(
        db_adapter.clone(),
        photo_storage,
        geocoder,
        config.service_settings(),
    ));
    info!(
        "Incident service ready (status set: {:?})",
        config.status_set
    );

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        service,
        config: config.clone(),
    });
    let app = build_router(app_state)?;

    // --- 5. Start the Server ---
    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), shutdown.clone()));

    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    db_pool.close().await;
    info!("Server stopped.");
    Ok(())
}
