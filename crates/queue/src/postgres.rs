//! PostgreSQL queue backend.
//!
//! Jobs live in the `episode_jobs` table. Claims use
//! `SELECT ... FOR UPDATE SKIP LOCKED` so concurrent workers (in one process
//! or many) never claim the same row, and every worker write is filtered on
//! `lease_token` so a worker whose lease was reclaimed cannot touch the job.

use async_trait::async_trait;
use reelforge_core::episode::Episode;
use reelforge_core::job::{Job, JobStatus, JobView, CANCELLED_MESSAGE};
use reelforge_core::types::{JobId, Timestamp};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::{CancelOutcome, JobQueue, Lease, ATTEMPTS_EXHAUSTED_MESSAGE};

/// Column list for `episode_jobs` queries.
const COLUMNS: &str = "\
    id, prompt, status, progress, result, error, attempts, \
    created_at, updated_at";

/// A row from the `episode_jobs` table.
#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    prompt: String,
    status: String,
    progress: i16,
    result: Option<Json<Episode>>,
    error: Option<String>,
    attempts: i32,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<JobRow> for Job {
    type Error = QueueError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e: reelforge_core::error::CoreError| QueueError::Corrupt(e.to_string()))?;
        Ok(Job {
            id: JobId::from(row.id),
            prompt: row.prompt,
            status,
            progress: row.progress.clamp(0, 100) as u8,
            result: row.result.map(|Json(episode)| episode),
            error: row.error,
            attempts: row.attempts.max(0) as u32,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// [`JobQueue`] backed by a PostgreSQL connection pool.
pub struct PgJobQueue {
    pool: PgPool,
    config: QueueConfig,
}

impl PgJobQueue {
    /// Wrap an existing pool. Migrations are not run.
    pub fn new(pool: PgPool, config: QueueConfig) -> Self {
        Self { pool, config }
    }

    /// Connect, verify the connection and apply pending migrations.
    pub async fn connect(database_url: &str, config: QueueConfig) -> Result<Self, QueueError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        tracing::info!("Database connection pool created");

        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&pool)
            .await?;
        tracing::info!("Database health check passed");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self::new(pool, config))
    }

    /// Fail active jobs with expired leases that have no attempts left.
    async fn fail_exhausted(&self) -> Result<(), QueueError> {
        let failed = sqlx::query(
            "UPDATE episode_jobs \
             SET status = 'failed', error = $1, lease_token = NULL, \
                 lease_expires_at = NULL, updated_at = NOW() \
             WHERE status = 'active' AND lease_expires_at < NOW() AND attempts >= $2",
        )
        .bind(ATTEMPTS_EXHAUSTED_MESSAGE)
        .bind(self.max_attempts())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if failed > 0 {
            tracing::warn!(failed, "Failed jobs that exceeded their delivery attempts");
        }
        Ok(())
    }

    /// Atomically claim the oldest claimable job, if any.
    async fn claim_next(&self) -> Result<Option<Lease>, QueueError> {
        let token = Uuid::new_v4();
        let claimed: Option<(Uuid, String, i32)> = sqlx::query_as(
            "UPDATE episode_jobs \
             SET status = 'active', attempts = attempts + 1, lease_token = $1, \
                 lease_expires_at = NOW() + make_interval(secs => $2), updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM episode_jobs \
                 WHERE (status = 'queued' \
                        OR (status = 'active' AND lease_expires_at < NOW())) \
                   AND attempts < $3 \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING id, prompt, attempts",
        )
        .bind(token)
        .bind(self.config.lease_duration.as_secs_f64())
        .bind(self.max_attempts())
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed.map(|(id, prompt, attempts)| Lease {
            job_id: JobId::from(id),
            token,
            prompt,
            attempt: attempts.max(0) as u32,
        }))
    }

    fn max_attempts(&self) -> i32 {
        i32::try_from(self.config.max_attempts).unwrap_or(i32::MAX)
    }

    /// Map a fenced write that touched no rows to [`QueueError::LeaseLost`].
    fn fenced(rows_affected: u64, lease: &Lease) -> Result<(), QueueError> {
        if rows_affected == 0 {
            Err(QueueError::LeaseLost(lease.job_id))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, prompt: &str) -> Result<Job, QueueError> {
        let query = format!(
            "INSERT INTO episode_jobs (id, prompt, status, progress) \
             VALUES ($1, $2, 'queued', 0) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(JobId::new().as_uuid())
            .bind(prompt)
            .fetch_one(&self.pool)
            .await?;
        Job::try_from(row)
    }

    async fn dequeue(&self) -> Result<Lease, QueueError> {
        loop {
            self.fail_exhausted().await?;
            if let Some(lease) = self.claim_next().await? {
                tracing::debug!(job_id = %lease.job_id, attempt = lease.attempt, "Job claimed");
                return Ok(lease);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn get_status(&self, id: JobId) -> Result<JobView, QueueError> {
        let query = format!("SELECT {COLUMNS} FROM episode_jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(QueueError::NotFound(id))?;
        Ok(Job::try_from(row)?.view())
    }

    async fn heartbeat(&self, lease: &Lease) -> Result<(), QueueError> {
        let rows = sqlx::query(
            "UPDATE episode_jobs \
             SET lease_expires_at = NOW() + make_interval(secs => $3) \
             WHERE id = $1 AND lease_token = $2 AND status = 'active'",
        )
        .bind(lease.job_id.as_uuid())
        .bind(lease.token)
        .bind(self.config.lease_duration.as_secs_f64())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Self::fenced(rows, lease)
    }

    async fn report_progress(&self, lease: &Lease, progress: u8) -> Result<(), QueueError> {
        let rows = sqlx::query(
            "UPDATE episode_jobs \
             SET progress = GREATEST(progress, $3), updated_at = NOW() \
             WHERE id = $1 AND lease_token = $2 AND status = 'active'",
        )
        .bind(lease.job_id.as_uuid())
        .bind(lease.token)
        .bind(i16::from(progress.min(100)))
        .execute(&self.pool)
        .await?
        .rows_affected();
        Self::fenced(rows, lease)
    }

    async fn complete(&self, lease: &Lease, episode: &Episode) -> Result<(), QueueError> {
        let rows = sqlx::query(
            "UPDATE episode_jobs \
             SET status = 'completed', progress = 100, result = $3, \
                 lease_token = NULL, lease_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND lease_token = $2 AND status = 'active'",
        )
        .bind(lease.job_id.as_uuid())
        .bind(lease.token)
        .bind(Json(episode))
        .execute(&self.pool)
        .await?
        .rows_affected();
        Self::fenced(rows, lease)
    }

    async fn fail(&self, lease: &Lease, error: &str) -> Result<(), QueueError> {
        let rows = sqlx::query(
            "UPDATE episode_jobs \
             SET status = 'failed', error = $3, \
                 lease_token = NULL, lease_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND lease_token = $2 AND status = 'active'",
        )
        .bind(lease.job_id.as_uuid())
        .bind(lease.token)
        .bind(error)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Self::fenced(rows, lease)
    }

    async fn request_cancel(&self, id: JobId) -> Result<CancelOutcome, QueueError> {
        // A single statement decides the outcome from the status it locked.
        let previous: Option<(String,)> = sqlx::query_as(
            "WITH target AS ( \
                 SELECT id, status FROM episode_jobs WHERE id = $1 FOR UPDATE \
             ), updated AS ( \
                 UPDATE episode_jobs j \
                 SET status = CASE WHEN t.status = 'queued' THEN 'failed' ELSE j.status END, \
                     error = CASE WHEN t.status = 'queued' THEN $2 ELSE j.error END, \
                     cancel_requested = (t.status = 'active') OR j.cancel_requested, \
                     updated_at = NOW() \
                 FROM target t \
                 WHERE j.id = t.id AND t.status IN ('queued', 'active') \
             ) \
             SELECT status FROM target",
        )
        .bind(id.as_uuid())
        .bind(CANCELLED_MESSAGE)
        .fetch_optional(&self.pool)
        .await?;

        let (status,) = previous.ok_or(QueueError::NotFound(id))?;
        match status
            .parse::<JobStatus>()
            .map_err(|e| QueueError::Corrupt(e.to_string()))?
        {
            JobStatus::Queued => Ok(CancelOutcome::Cancelled),
            JobStatus::Active => Ok(CancelOutcome::Requested),
            JobStatus::Completed | JobStatus::Failed => Err(QueueError::AlreadyTerminal(id)),
        }
    }

    async fn is_cancel_requested(&self, id: JobId) -> Result<bool, QueueError> {
        sqlx::query_scalar::<_, bool>("SELECT cancel_requested FROM episode_jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(QueueError::NotFound(id))
    }
}
