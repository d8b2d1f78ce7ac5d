use std::sync::Arc;

use anyhow::{Context, Result};
use scorm_runtime::catalog::InMemoryCatalog;
use scorm_runtime::config::AppConfig;
use scorm_runtime::persist::InMemoryCommitStore;
use scorm_runtime::service::RuntimeService;
use scorm_runtime::web::{AppState, build_router};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("failed to load application configuration")?;

    // Standalone deployments run on the in-memory stores; platform
    // deployments implement CourseCatalog/CommitStore against their
    // database and construct RuntimeService with those instead.
    let catalog = Arc::new(InMemoryCatalog::new());
    let store = Arc::new(InMemoryCommitStore::new());
    let service = Arc::new(RuntimeService::new(catalog, store, config.runtime_config()));

    let app = build_router(AppState::new(service));

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "scorm runtime started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scorm_runtime=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
