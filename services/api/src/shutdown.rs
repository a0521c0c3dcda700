//! services/api/src/shutdown.rs
//!
//! Ties process signals to the server's cancellation token.

use std::fmt::Debug;
use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels `token` once `signal` fires. If the signal cannot be registered
/// the token is left alone and the server keeps running.
pub async fn cancel_on_signal<F, E>(signal: F, token: CancellationToken)
where
    F: Future<Output = Result<(), E>>,
    E: Debug,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for shutdown signal: {:?}", e);
        return;
    }
    info!("Shutdown signal received.");
    token.cancel();
}
