//! OS signal bridge.
//!
//! Translates SIGINT / SIGTERM (Ctrl+C elsewhere) into a single
//! [`Shutdown::trigger`]. The listener holds one active waiter for as long as
//! it runs, and it also exits when shutdown is requested some other way.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::lifecycle::{ActiveWaiters, Shutdown, ShutdownReason};

/// Spawns the signal listener.
///
/// Installation failures are logged; the process then relies on programmatic
/// shutdown only.
pub fn spawn_signal_listener(shutdown: Shutdown, waiters: &ActiveWaiters) -> JoinHandle<()> {
    let guard = waiters.hold();
    tokio::spawn(async move {
        let _guard = guard;
        match wait_for_signal(&shutdown).await {
            Some(reason) => {
                info!(%reason, "Stop signal received");
                shutdown.trigger(reason);
            }
            None => info!("Signal listener released"),
        }
    })
}

/// Resolves with the delivered signal, or `None` if shutdown fired first.
#[cfg(unix)]
async fn wait_for_signal(shutdown: &Shutdown) -> Option<ShutdownReason> {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Failed to install signal handlers");
            shutdown.wait().await;
            return None;
        }
    };

    tokio::select! {
        _ = sigint.recv() => Some(ShutdownReason::Interrupt),
        _ = sigterm.recv() => Some(ShutdownReason::Terminate),
        _ = shutdown.wait() => None,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal(shutdown: &Shutdown) -> Option<ShutdownReason> {
    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => Some(ShutdownReason::Interrupt),
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                shutdown.wait().await;
                None
            }
        },
        _ = shutdown.wait() => None,
    }
}
