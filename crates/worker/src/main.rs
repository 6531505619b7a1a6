use std::sync::Arc;

use reelforge_pipeline::{PipelineConfig, PipelineExecutor, WorkerConfig, WorkerPool};
use reelforge_providers::{ProviderConfig, Providers};
use reelforge_queue::{JobQueue, PgJobQueue, QueueConfig};
use reelforge_worker::config::WorkerSettings;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelforge_worker=debug,reelforge_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = WorkerSettings::from_env();
    let queue_config = QueueConfig::from_env();
    let provider_config = ProviderConfig::from_env();
    for key in provider_config.missing_keys() {
        tracing::warn!(key, "Provider key not set; its calls will use fallbacks");
    }

    // A separate process can only share jobs through the database.
    let database_url = queue_config
        .database_url
        .clone()
        .expect("DATABASE_URL must be set for the worker process");
    let queue: Arc<dyn JobQueue> = Arc::new(
        PgJobQueue::connect(&database_url, queue_config.clone())
            .await
            .expect("Failed to initialise the PostgreSQL job queue"),
    );

    let executor = Arc::new(PipelineExecutor::new(
        Providers::from_config(&provider_config),
        Arc::clone(&queue),
        PipelineConfig::from_env(),
    ));
    let pool = Arc::new(WorkerPool::new(
        queue,
        executor,
        WorkerConfig::for_lease(settings.concurrency, queue_config.lease_duration),
    ));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(pool.run(cancel.clone()));

    shutdown_signal().await;
    cancel.cancel();

    if tokio::time::timeout(settings.shutdown_timeout, handle).await.is_err() {
        tracing::warn!("Workers did not stop in time");
    }
    tracing::info!("Worker shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
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
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down workers"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down workers"),
    }
}
