//! Graceful shutdown handling for probemond.
//!
//! A single [`CancellationToken`] is shared by the collector, pruner, and
//! storage writer; SIGINT or SIGTERM cancels it.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long each loop gets to notice cancellation before it is abandoned.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve once SIGINT or (on unix) SIGTERM arrives.
pub async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => "SIGINT",
                    _ = term.recv() => "SIGTERM",
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    }
}

/// Cancel `token` on the first shutdown signal.
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = wait_for_signal() => {
                info!("Received {}, shutting down", signal);
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

/// Wait for a background loop to stop, giving up after [`DRAIN_TIMEOUT`].
pub async fn join(name: &str, handle: JoinHandle<()>) {
    match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
        Ok(Ok(())) => info!("{} stopped", name),
        Ok(Err(e)) => warn!("{} task failed: {}", name, e),
        Err(_) => warn!("{} did not stop within {:?}", name, DRAIN_TIMEOUT),
    }
}
