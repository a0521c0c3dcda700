//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use incident_core::{ServiceSettings, StatusSet};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Shared secret required to register an official. Official signup is
    /// disabled when unset.
    pub admin_key: Option<String>,
    pub upload_dir: PathBuf,
    pub max_photo_bytes: usize,
    pub geocoder_url: String,
    pub geocode_timeout: Duration,
    pub io_timeout: Duration,
    pub status_set: StatusSet,
    pub cors_origin: String,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let admin_key = std::env::var("ADMIN_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        // --- Load Incident Settings ---
        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));
        let max_photo_bytes = parse_var("MAX_PHOTO_BYTES", 5 * 1024 * 1024usize)?;
        let geocoder_url = std::env::var("GEOCODER_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());
        let geocode_timeout = Duration::from_millis(parse_var("GEOCODE_TIMEOUT_MS", 3_000u64)?);
        let io_timeout = Duration::from_millis(parse_var("IO_TIMEOUT_MS", 5_000u64)?);
        let status_set = parse_var("STATUS_SET", StatusSet::Standard)?;
        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            admin_key,
            upload_dir,
            max_photo_bytes,
            geocoder_url,
            geocode_timeout,
            io_timeout,
            status_set,
            cors_origin,
        })
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            io_timeout: self.io_timeout,
            geocode_timeout: self.geocode_timeout,
            status_set: self.status_set,
            max_photo_bytes: self.max_photo_bytes,
        }
    }
}
