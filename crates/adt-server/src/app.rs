//! Service wiring: initial build, background tasks and the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::FileCatalog;
use crate::config::Config;
use crate::engine::DeliveryEngine;
use crate::http::build_router;
use crate::listener::listen_and_refresh;
use crate::notify::FileWatchNotifier;
use crate::observability::DeliveryMetrics;
use crate::refresher::refresh_periodically;

/// Upper bound on waiting for background tasks after the server stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the service until Ctrl-C or SIGTERM.
pub async fn serve(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested");
        on_signal.cancel();
    });

    let listener = TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    serve_with(config, listener, cancel).await
}

/// Resolve on the first Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Run the service on an already bound listener until `cancel` fires.
pub async fn serve_with(
    config: Config,
    listener: TcpListener,
    cancel: CancellationToken,
) -> Result<()> {
    let engine = Arc::new(DeliveryEngine::new());
    let source = Arc::new(FileCatalog::new(&config.catalog.path));
    let metrics = Arc::new(DeliveryMetrics::new());

    // Taken before the initial load so a write racing it is not lost.
    let notifier = FileWatchNotifier::new(&config.catalog.path, config.poll_interval())
        .with_channel(config.channel())
        .with_baseline()
        .await;

    let stats = engine
        .build_snapshot(source.as_ref())
        .await
        .context("Initial index build failed")?;
    info!(
        "Initial index ready: {} campaigns ({} active)",
        stats.campaigns, stats.active
    );

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    tasks.push(tokio::spawn(listen_and_refresh(
        Arc::clone(&engine),
        Arc::clone(&source),
        notifier,
        config.listener_settings(),
        cancel.clone(),
    )));

    if let Some(every) = config.refresh_interval() {
        tasks.push(tokio::spawn(refresh_periodically(
            Arc::clone(&engine),
            Arc::clone(&source),
            every,
            cancel.clone(),
        )));
    }

    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("HTTP API listening on {}", addr);

    let shutdown = cancel.clone();
    let served = axum::serve(listener, build_router(engine, metrics))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    cancel.cancel();
    for task in tasks {
        join_with_grace(task).await;
    }
    info!("Server stopped");

    served.context("HTTP server failed")
}

async fn join_with_grace(task: JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Background task failed: {}", e),
        Err(_) => warn!("Background task did not stop within {:?}", SHUTDOWN_GRACE),
    }
}
