//! Integration tests for the PostgreSQL queue backend.
//!
//! Each test gets a fresh database with the crate's migrations applied.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use reelforge_core::episode::Episode;
use reelforge_core::job::{JobStatus, CANCELLED_MESSAGE};
use reelforge_core::types::JobId;
use reelforge_queue::{
    CancelOutcome, JobQueue, PgJobQueue, QueueConfig, QueueError, ATTEMPTS_EXHAUSTED_MESSAGE,
};
use sqlx::PgPool;

fn test_config() -> QueueConfig {
    QueueConfig {
        database_url: None,
        lease_duration: Duration::from_secs(30),
        max_attempts: 3,
        poll_interval: Duration::from_millis(20),
    }
}

fn episode() -> Episode {
    Episode {
        title: "AI Film: test".into(),
        script: "Scene 1: test".into(),
        scenes: Vec::new(),
    }
}

/// Push a job's lease into the past so the next claim may take it.
async fn expire_lease(pool: &PgPool, id: JobId) {
    sqlx::query(
        "UPDATE episode_jobs SET lease_expires_at = NOW() - INTERVAL '1 second' WHERE id = $1",
    )
    .bind(id.as_uuid())
    .execute(pool)
    .await
    .unwrap();
}

/// Claim with a short deadline; `None` when nothing is claimable.
async fn try_dequeue(queue: &PgJobQueue) -> Option<reelforge_queue::Lease> {
    tokio::time::timeout(Duration::from_millis(300), queue.dequeue())
        .await
        .ok()
        .map(|claimed| claimed.unwrap())
}

// ---------------------------------------------------------------------------
// Submission and status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn enqueued_job_is_visible_as_queued(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let job = queue.enqueue("a robot learns to paint").await.unwrap();

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.attempts, 0);

    let view = queue.get_status(job.id).await.unwrap();
    assert_eq!(view.status, JobStatus::Queued);
    assert_eq!(view.progress, 0);
    assert!(view.result.is_none());
    assert!(view.error.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_id_is_not_found(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let id = JobId::new();

    assert_matches!(queue.get_status(id).await, Err(QueueError::NotFound(got)) if got == id);
    assert_matches!(queue.request_cancel(id).await, Err(QueueError::NotFound(_)));
    assert_matches!(queue.is_cancel_requested(id).await, Err(QueueError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Claims and leases
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn dequeue_claims_the_oldest_job_first(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let first = queue.enqueue("first").await.unwrap();
    let second = queue.enqueue("second").await.unwrap();

    let a = queue.dequeue().await.unwrap();
    let b = queue.dequeue().await.unwrap();
    assert_eq!(a.job_id, first.id);
    assert_eq!(a.prompt, "first");
    assert_eq!(a.attempt, 1);
    assert_eq!(b.job_id, second.id);
    assert_eq!(
        queue.get_status(first.id).await.unwrap().status,
        JobStatus::Active
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_claims_never_share_a_job(pool: PgPool) {
    let queue = Arc::new(PgJobQueue::new(pool, test_config()));
    let mut submitted = HashSet::new();
    for n in 0..6 {
        submitted.insert(queue.enqueue(&format!("job {n}")).await.unwrap().id);
    }

    let mut claims = tokio::task::JoinSet::new();
    for _ in 0..6 {
        let queue = Arc::clone(&queue);
        claims.spawn(async move { queue.dequeue().await.unwrap().job_id });
    }

    let mut claimed = HashSet::new();
    while let Some(id) = claims.join_next().await {
        assert!(claimed.insert(id.unwrap()), "a job was claimed twice");
    }
    assert_eq!(claimed, submitted);
}

#[sqlx::test(migrations = "./migrations")]
async fn expired_lease_is_redelivered_and_fences_the_old_owner(pool: PgPool) {
    let queue = PgJobQueue::new(pool.clone(), test_config());
    let job = queue.enqueue("crashy").await.unwrap();
    let stale = queue.dequeue().await.unwrap();
    queue.report_progress(&stale, 47).await.unwrap();

    expire_lease(&pool, job.id).await;

    let fresh = try_dequeue(&queue).await.expect("expired job should be reclaimed");
    assert_eq!(fresh.job_id, job.id);
    assert_eq!(fresh.attempt, 2);
    assert_ne!(fresh.token, stale.token);

    assert_matches!(
        queue.report_progress(&stale, 90).await,
        Err(QueueError::LeaseLost(_))
    );
    assert_matches!(queue.heartbeat(&stale).await, Err(QueueError::LeaseLost(_)));
    assert_matches!(
        queue.complete(&stale, &episode()).await,
        Err(QueueError::LeaseLost(_))
    );

    let view = queue.get_status(job.id).await.unwrap();
    assert_eq!(view.status, JobStatus::Active);
    assert_eq!(view.progress, 47);
    assert!(view.result.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn heartbeat_renews_an_expired_lease(pool: PgPool) {
    let queue = PgJobQueue::new(pool.clone(), test_config());
    let job = queue.enqueue("steady").await.unwrap();
    let lease = queue.dequeue().await.unwrap();

    expire_lease(&pool, job.id).await;
    queue.heartbeat(&lease).await.unwrap();

    assert!(
        try_dequeue(&queue).await.is_none(),
        "job must not be redelivered after a heartbeat"
    );
    queue.report_progress(&lease, 25).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn exhausted_attempts_fail_the_job(pool: PgPool) {
    let queue = PgJobQueue::new(
        pool.clone(),
        QueueConfig {
            max_attempts: 2,
            ..test_config()
        },
    );
    let job = queue.enqueue("poison").await.unwrap();

    queue.dequeue().await.unwrap();
    expire_lease(&pool, job.id).await;
    let second = try_dequeue(&queue).await.expect("second delivery");
    assert_eq!(second.attempt, 2);
    expire_lease(&pool, job.id).await;

    assert!(
        try_dequeue(&queue).await.is_none(),
        "job with no attempts left must not be claimed"
    );
    let view = queue.get_status(job.id).await.unwrap();
    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.error.as_deref(), Some(ATTEMPTS_EXHAUSTED_MESSAGE));
}

// ---------------------------------------------------------------------------
// Worker writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn progress_never_decreases(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let job = queue.enqueue("p").await.unwrap();
    let lease = queue.dequeue().await.unwrap();

    queue.report_progress(&lease, 68).await.unwrap();
    queue.report_progress(&lease, 47).await.unwrap();
    assert_eq!(queue.get_status(job.id).await.unwrap().progress, 68);
}

#[sqlx::test(migrations = "./migrations")]
async fn complete_stores_the_episode(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let job = queue.enqueue("p").await.unwrap();
    let lease = queue.dequeue().await.unwrap();

    queue.complete(&lease, &episode()).await.unwrap();

    let view = queue.get_status(job.id).await.unwrap();
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.progress, 100);
    assert_eq!(view.result, Some(episode()));
    assert_matches!(
        queue.fail(&lease, "late").await,
        Err(QueueError::LeaseLost(_))
    );
    assert_eq!(
        queue.get_status(job.id).await.unwrap().status,
        JobStatus::Completed
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn fail_records_the_error(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let job = queue.enqueue("p").await.unwrap();
    let lease = queue.dequeue().await.unwrap();

    queue.fail(&lease, "Episode generation failed").await.unwrap();

    let view = queue.get_status(job.id).await.unwrap();
    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.error.as_deref(), Some("Episode generation failed"));
    assert!(view.result.is_none());
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn cancelling_a_queued_job_fails_it_and_skips_delivery(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let cancelled = queue.enqueue("never mind").await.unwrap();
    let kept = queue.enqueue("keep").await.unwrap();

    assert_eq!(
        queue.request_cancel(cancelled.id).await.unwrap(),
        CancelOutcome::Cancelled
    );
    let view = queue.get_status(cancelled.id).await.unwrap();
    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.error.as_deref(), Some(CANCELLED_MESSAGE));

    let lease = queue.dequeue().await.unwrap();
    assert_eq!(lease.job_id, kept.id);
    assert!(try_dequeue(&queue).await.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn cancelling_an_active_job_sets_the_flag(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let job = queue.enqueue("running").await.unwrap();
    queue.dequeue().await.unwrap();

    assert!(!queue.is_cancel_requested(job.id).await.unwrap());
    assert_eq!(
        queue.request_cancel(job.id).await.unwrap(),
        CancelOutcome::Requested
    );
    assert!(queue.is_cancel_requested(job.id).await.unwrap());
    assert_eq!(
        queue.get_status(job.id).await.unwrap().status,
        JobStatus::Active
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn cancelling_a_finished_job_conflicts(pool: PgPool) {
    let queue = PgJobQueue::new(pool, test_config());
    let job = queue.enqueue("done").await.unwrap();
    let lease = queue.dequeue().await.unwrap();
    queue.complete(&lease, &episode()).await.unwrap();

    assert_matches!(
        queue.request_cancel(job.id).await,
        Err(QueueError::AlreadyTerminal(_))
    );
    assert!(!queue.is_cancel_requested(job.id).await.unwrap());
}
