//! Signal-driven shutdown.

use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `cancel` when SIGINT or SIGTERM arrives.
pub fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match unix_signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {e}");
                    return;
                }
            };

            tokio::select! {
                result = signal::ctrl_c() => match result {
                    Ok(()) => info!("Received SIGINT, initiating graceful shutdown"),
                    Err(e) => {
                        error!("Failed to listen for SIGINT: {e}");
                        return;
                    }
                },
                _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            }
        }

        #[cfg(not(unix))]
        {
            match signal::ctrl_c().await {
                Ok(()) => info!("Received SIGINT, initiating graceful shutdown"),
                Err(e) => {
                    error!("Failed to listen for SIGINT: {e}");
                    return;
                }
            }
        }

        cancel.cancel();
    });
}
