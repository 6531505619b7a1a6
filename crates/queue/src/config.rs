use std::time::Duration;

/// Queue configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// PostgreSQL URL. `None` selects the in-memory backend.
    pub database_url: Option<String>,
    /// How long a claim stays valid without a heartbeat (default: 300s).
    pub lease_duration: Duration,
    /// Deliveries allowed before a job is failed (default: 3).
    pub max_attempts: u32,
    /// How often an idle worker re-checks for claimable jobs (default: 500ms).
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            lease_duration: Duration::from_secs(300),
            max_attempts: 3,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl QueueConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `DATABASE_URL`           | unset   |
    /// | `JOB_LEASE_SECS`         | `300`   |
    /// | `JOB_MAX_ATTEMPTS`       | `3`     |
    /// | `QUEUE_POLL_INTERVAL_MS` | `500`   |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let lease_secs: u64 = std::env::var("JOB_LEASE_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("JOB_LEASE_SECS must be a valid u64");

        let max_attempts: u32 = std::env::var("JOB_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("JOB_MAX_ATTEMPTS must be a valid u32");

        let poll_interval_ms: u64 = std::env::var("QUEUE_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("QUEUE_POLL_INTERVAL_MS must be a valid u64");

        Self {
            database_url,
            lease_duration: Duration::from_secs(lease_secs),
            max_attempts: max_attempts.max(1),
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }
}
