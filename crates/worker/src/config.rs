use std::time::Duration;

use reelforge_pipeline::worker::DEFAULT_WORKER_CONCURRENCY;

/// Worker process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Jobs processed concurrently by this process (default: `2`).
    pub concurrency: usize,
    /// How long shutdown waits for workers to stop (default: `30`).
    pub shutdown_timeout: Duration,
}

impl WorkerSettings {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `WORKER_CONCURRENCY`    | `2`     |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`    |
    pub fn from_env() -> Self {
        let concurrency = match std::env::var("WORKER_CONCURRENCY") {
            Ok(raw) => parse_concurrency(&raw),
            Err(_) => DEFAULT_WORKER_CONCURRENCY,
        };

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            concurrency,
            shutdown_timeout: Duration::from_secs(shutdown_timeout_secs),
        }
    }
}

fn parse_concurrency(raw: &str) -> usize {
    let concurrency: usize = raw
        .trim()
        .parse()
        .expect("WORKER_CONCURRENCY must be a valid usize");
    concurrency.max(1)
}
