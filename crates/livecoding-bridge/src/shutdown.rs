//! Signal handling for graceful shutdown

use std::future::Future;

use anyhow::Result;

/// Future that resolves on the first SIGINT or SIGTERM
///
/// Handlers are installed before this returns, so a signal arriving before
/// the future is first polled is not lost.
///
/// # Errors
/// Returns an error if a signal handler cannot be installed
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
    use anyhow::Context;
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM")?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        }
        tracing::info!("Shutdown requested; draining connections");
    })
}

/// Future that resolves on Ctrl-C
///
/// # Errors
/// Never fails on this platform; the signature matches the unix variant
#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested; draining connections");
    })
}
