//! Operator-initiated cancellation
//!
//! SIGINT and SIGTERM are turned into a [`CancellationToken`] so the lifecycle
//! can race them against the poll task. Handlers are installed before the Pod
//! is submitted; a signal that lands during the create call is still observed
//! afterward and the Pod is cleaned up.

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Error;

/// Install signal handlers and return a token cancelled on the first signal
pub fn shutdown_token() -> Result<CancellationToken, Error> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| Error::internal(format!("failed to install SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| Error::internal(format!("failed to install SIGTERM handler: {e}")))?;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        info!(signal = name, "received signal, cancelling");
        trigger.cancel();
    });

    Ok(token)
}
