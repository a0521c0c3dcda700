//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use incident_core::{DatabaseService, IncidentService, PortError, PortResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Used directly by the auth plumbing; incident operations go through `service`.
    pub db: Arc<dyn DatabaseService>,
    pub service: Arc<IncidentService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Runs a store call from the auth plumbing under the configured I/O timeout.
    pub async fn store<T, F>(&self, operation: &'static str, call: F) -> PortResult<T>
    where
        F: Future<Output = PortResult<T>>,
    {
        bounded(self.config.io_timeout, operation, call).await
    }
}

/// A timed-out call surfaces as `PortError::Unexpected`, which the core maps
/// to an internal error.
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> PortResult<T>
where
    F: Future<Output = PortResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} timed out after {:?}", operation, limit);
            Err(PortError::Unexpected(format!("{operation} timed out")))
        }
    }
}
