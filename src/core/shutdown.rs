//! # OS shutdown signal handling.

use tracing::info;

/// Waits until the process receives a shutdown signal.
///
/// Unix: SIGINT (Ctrl+C), SIGTERM or SIGQUIT. Other platforms: Ctrl+C only.
pub(crate) async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut term, mut quit) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::quit()),
        ) {
            (Ok(term), Ok(quit)) => (term, quit),
            _ => {
                info!("signal handlers unavailable; falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = term.recv() => info!("received SIGTERM"),
            _ = quit.recv() => info!("received SIGQUIT"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl+C");
    }
}
