//! Process lifecycle: wire the coordinator, executor and router, then serve
//! until a shutdown signal arrives.

use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use livecoding_core::{load_config, BuildExecutor, CompileCoordinator, DiagnosticsSink};
use tokio::net::TcpListener;

use crate::{
    cli::CliArgs,
    engine::CommandEngine,
    http::{router, AppState},
    shutdown::shutdown_signal,
};

/// Load config, start everything, and block until shutdown
///
/// # Errors
/// Returns an error if config is invalid, the executor cannot start, the
/// port cannot be bound, or the server fails
pub async fn run(args: CliArgs, sink: DiagnosticsSink) -> Result<()> {
    let mut config = load_config(args.config.as_deref()).await?;
    args.apply(&mut config)?;

    let engine = Arc::new(CommandEngine::new(&config.engine));
    let coordinator = CompileCoordinator::new(engine, sink, &config.capture);
    coordinator.initialize();

    let executor = Arc::new(BuildExecutor::spawn()?);
    let state = AppState::new(coordinator.clone(), Arc::clone(&executor), &config.server.route);
    let app = router(state, &config.server);

    let addr = SocketAddr::new(config.server.bind_address, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to start HTTP listener on {addr}"))?;

    tracing::info!(
        "Live coding endpoint: http://{addr}{} (status: {})",
        config.server.route,
        config.server.status_route()
    );

    let served = serve(listener, app, shutdown_signal()?).await;

    coordinator.shutdown();
    tokio::task::spawn_blocking(move || executor.shutdown())
        .await
        .context("Build executor shutdown task failed")?;
    tracing::info!("Live coding bridge stopped");

    served
}

/// Serve `app` on `listener` until `shutdown` resolves
///
/// # Errors
/// Returns an error if the server fails while accepting connections
pub async fn serve<F>(listener: TcpListener, app: axum::Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}
