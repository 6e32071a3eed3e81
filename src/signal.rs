//! # Termination-signal monitoring.
//!
//! Provides [`wait_for_termination_signal`], an async helper that completes
//! when the process receives a termination signal, and [`monitor`], the
//! single task that turns such a signal into cooperative cancellation.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(unix)]
pub async fn wait_for_termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(not(unix))]
pub async fn wait_for_termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Spawns the signal monitor bound to `token`.
///
/// The monitor suspends until either the token is cancelled elsewhere (it
/// then exits without acting) or a termination signal arrives (it logs a
/// notice and cancels the token). Cancelling an already-cancelled token is
/// a no-op, so racing signals cannot double-fire the transition.
///
/// Exactly one monitor runs per process; the returned handle is joined by
/// the orchestrator during shutdown.
///
/// Should signal registration itself fail, the monitor logs the error and
/// cancels the token rather than leaving the process without signal
/// coverage.
pub fn monitor(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = wait_for_termination_signal() => {
                match result {
                    Ok(()) => tracing::info!("interrupt received, closing agent"),
                    Err(error) => tracing::error!(%error, "signal listener failed, closing agent"),
                }
                token.cancel();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_monitor_exits_when_parent_cancels() {
        let token = CancellationToken::new();
        let handle = monitor(token.clone());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor must exit promptly after cancellation")
            .expect("monitor task must not panic");
    }

    #[tokio::test]
    async fn test_double_cancel_is_harmless() {
        let token = CancellationToken::new();
        let handle = monitor(token.clone());

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor must exit promptly")
            .expect("monitor task must not panic");
        // The token stays cancelled indefinitely (level-triggered).
        assert!(token.is_cancelled());
    }
}
