use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reelforge_pipeline::{PipelineConfig, PipelineExecutor, WorkerConfig, WorkerPool};
use reelforge_providers::{ProviderConfig, Providers};
use reelforge_queue::{JobQueue, MemoryJobQueue, PgJobQueue, QueueConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelforge_api::config::ServerConfig;
use reelforge_api::router::build_app_router;
use reelforge_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "reelforge_api=debug,reelforge_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    let queue_config = QueueConfig::from_env();

    // --- Job queue ---
    let queue: Arc<dyn JobQueue> = match &queue_config.database_url {
        Some(url) => Arc::new(
            PgJobQueue::connect(url, queue_config.clone())
                .await
                .expect("Failed to initialise the PostgreSQL job queue"),
        ),
        None => {
            tracing::warn!("DATABASE_URL not set; jobs are held in memory and lost on restart");
            Arc::new(MemoryJobQueue::new(queue_config.clone()))
        }
    };

    // --- Embedded workers ---
    let worker_cancel = CancellationToken::new();
    let worker_handle = if config.embedded_workers > 0 {
        let provider_config = ProviderConfig::from_env();
        for key in provider_config.missing_keys() {
            tracing::warn!(key, "Provider key not set; its calls will use fallbacks");
        }
        let executor = Arc::new(PipelineExecutor::new(
            Providers::from_config(&provider_config),
            Arc::clone(&queue),
            PipelineConfig::from_env(),
        ));
        let pool = Arc::new(WorkerPool::new(
            Arc::clone(&queue),
            executor,
            WorkerConfig::for_lease(config.embedded_workers, queue_config.lease_duration),
        ));
        Some(tokio::spawn(pool.run(worker_cancel.clone())))
    } else {
        if queue_config.database_url.is_none() {
            tracing::warn!("EMBEDDED_WORKERS=0 with the in-memory queue; submitted jobs will never run");
        }
        None
    };

    // --- Router ---
    let state = AppState::new(queue);
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    worker_cancel.cancel();
    if let Some(handle) = worker_handle {
        let grace = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Embedded workers did not stop in time");
        } else {
            tracing::info!("Embedded workers stopped");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
