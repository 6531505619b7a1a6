//! In-process queue backend.
//!
//! All job records live behind one mutex, so a status read always observes
//! a whole job and never a partially written result. Idle workers wait on a
//! [`Notify`] woken by `enqueue`, and re-check on a timer so expired leases
//! are picked up without any extra reaper task.

use std::collections::{BTreeSet, HashMap, VecDeque};

use async_trait::async_trait;
use reelforge_core::episode::Episode;
use reelforge_core::job::{Job, JobStatus, JobView, CANCELLED_MESSAGE};
use reelforge_core::progress::PROGRESS_COMPLETE;
use reelforge_core::types::{JobId, Timestamp};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::{CancelOutcome, JobQueue, Lease, ATTEMPTS_EXHAUSTED_MESSAGE};

/// [`JobQueue`] held entirely in memory.
pub struct MemoryJobQueue {
    state: Mutex<State>,
    notify: Notify,
    config: QueueConfig,
}

#[derive(Default)]
struct State {
    jobs: HashMap<JobId, Entry>,
    ready: VecDeque<JobId>,
    /// Jobs holding a lease, oldest first. Only these can expire.
    lease_index: BTreeSet<(Timestamp, JobId)>,
}

struct Entry {
    job: Job,
    lease: Option<LeaseSlot>,
    cancel_requested: bool,
}

#[derive(Clone, Copy)]
struct LeaseSlot {
    token: Uuid,
    expires_at: Instant,
}

impl Entry {
    fn new(job: Job) -> Self {
        Self {
            job,
            lease: None,
            cancel_requested: false,
        }
    }

    fn touch(&mut self) {
        self.job.updated_at = chrono::Utc::now();
    }

    fn index_key(&self) -> (Timestamp, JobId) {
        (self.job.created_at, self.job.id)
    }

    fn lease_expired(&self, now: Instant) -> bool {
        self.lease.map_or(true, |slot| slot.expires_at <= now)
    }

    /// Move to `next` if the lifecycle allows it.
    fn transition(&mut self, next: JobStatus) -> Result<(), QueueError> {
        let from = self.job.status;
        if !from.can_transition_to(next) {
            return Err(if from.is_terminal() {
                QueueError::AlreadyTerminal(self.job.id)
            } else {
                QueueError::InvalidTransition {
                    id: self.job.id,
                    from,
                    to: next,
                }
            });
        }
        self.job.status = next;
        self.touch();
        Ok(())
    }

    /// Hand the job to a worker, or fail it if it has no attempts left.
    fn claim(&mut self, config: &QueueConfig, now: Instant) -> Result<Option<Lease>, QueueError> {
        if self.job.attempts >= config.max_attempts {
            tracing::warn!(
                job_id = %self.job.id,
                attempts = self.job.attempts,
                "Job exceeded its delivery attempts",
            );
            self.transition(JobStatus::Failed)?;
            self.job.error = Some(ATTEMPTS_EXHAUSTED_MESSAGE.to_string());
            self.lease = None;
            return Ok(None);
        }

        self.transition(JobStatus::Active)?;
        let token = Uuid::new_v4();
        self.job.attempts += 1;
        self.lease = Some(LeaseSlot {
            token,
            expires_at: now + config.lease_duration,
        });

        Ok(Some(Lease {
            job_id: self.job.id,
            token,
            prompt: self.job.prompt.clone(),
            attempt: self.job.attempts,
        }))
    }
}

impl State {
    fn try_claim(&mut self, config: &QueueConfig) -> Result<Option<Lease>, QueueError> {
        let now = Instant::now();

        while let Some(id) = self.ready.pop_front() {
            // Cancelled while waiting.
            let queued = self
                .jobs
                .get(&id)
                .is_some_and(|e| e.job.status == JobStatus::Queued);
            if !queued {
                continue;
            }
            if let Some(lease) = self.claim(id, config, now)? {
                return Ok(Some(lease));
            }
        }

        let expired: Vec<JobId> = self
            .lease_index
            .iter()
            .map(|(_, id)| *id)
            .filter(|id| self.jobs.get(id).is_some_and(|e| e.lease_expired(now)))
            .collect();

        for id in expired {
            if let Some(entry) = self.jobs.get(&id) {
                tracing::warn!(
                    job_id = %id,
                    attempts = entry.job.attempts,
                    "Lease expired, redelivering job",
                );
            }
            if let Some(lease) = self.claim(id, config, now)? {
                return Ok(Some(lease));
            }
        }

        Ok(None)
    }

    /// Claim one job and keep the lease index in step with the outcome.
    fn claim(
        &mut self,
        id: JobId,
        config: &QueueConfig,
        now: Instant,
    ) -> Result<Option<Lease>, QueueError> {
        let Some(entry) = self.jobs.get_mut(&id) else {
            return Ok(None);
        };
        let key = entry.index_key();
        let lease = entry.claim(config, now)?;
        if lease.is_some() {
            self.lease_index.insert(key);
        } else {
            self.lease_index.remove(&key);
        }
        Ok(lease)
    }

    /// The entry for a lease, if the lease is still the job's current one.
    fn leased(&mut self, lease: &Lease) -> Result<&mut Entry, QueueError> {
        let entry = self
            .jobs
            .get_mut(&lease.job_id)
            .ok_or(QueueError::NotFound(lease.job_id))?;
        let current = entry.job.status == JobStatus::Active
            && entry.lease.is_some_and(|slot| slot.token == lease.token);
        if current {
            Ok(entry)
        } else {
            Err(QueueError::LeaseLost(lease.job_id))
        }
    }

    /// End a lease with a terminal status.
    fn finish(
        &mut self,
        lease: &Lease,
        status: JobStatus,
        apply: impl FnOnce(&mut Job),
    ) -> Result<(), QueueError> {
        let entry = self.leased(lease)?;
        entry.transition(status)?;
        apply(&mut entry.job);
        entry.lease = None;
        let key = entry.index_key();
        self.lease_index.remove(&key);
        Ok(())
    }
}

impl MemoryJobQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            config,
        }
    }

    /// Full job record, including delivery bookkeeping.
    pub async fn job(&self, id: JobId) -> Option<Job> {
        self.state.lock().await.jobs.get(&id).map(|e| e.job.clone())
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, prompt: &str) -> Result<Job, QueueError> {
        let job = Job::new(prompt);
        {
            let mut state = self.state.lock().await;
            state.ready.push_back(job.id);
            state.jobs.insert(job.id, Entry::new(job.clone()));
        }
        self.notify.notify_one();
        tracing::debug!(job_id = %job.id, "Job enqueued");
        Ok(job)
    }

    async fn dequeue(&self) -> Result<Lease, QueueError> {
        loop {
            if let Some(lease) = self.state.lock().await.try_claim(&self.config)? {
                tracing::debug!(job_id = %lease.job_id, attempt = lease.attempt, "Job claimed");
                return Ok(lease);
            }
            tokio::select! {
                () = self.notify.notified() => {}
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    async fn get_status(&self, id: JobId) -> Result<JobView, QueueError> {
        self.state
            .lock()
            .await
            .jobs
            .get(&id)
            .map(|e| e.job.view())
            .ok_or(QueueError::NotFound(id))
    }

    async fn heartbeat(&self, lease: &Lease) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let entry = state.leased(lease)?;
        if let Some(slot) = entry.lease.as_mut() {
            slot.expires_at = Instant::now() + self.config.lease_duration;
        }
        Ok(())
    }

    async fn report_progress(&self, lease: &Lease, progress: u8) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let entry = state.leased(lease)?;
        let progress = progress.min(PROGRESS_COMPLETE);
        if progress > entry.job.progress {
            entry.job.progress = progress;
            entry.touch();
        }
        Ok(())
    }

    async fn complete(&self, lease: &Lease, episode: &Episode) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.finish(lease, JobStatus::Completed, |job| {
            job.progress = PROGRESS_COMPLETE;
            job.result = Some(episode.clone());
        })
    }

    async fn fail(&self, lease: &Lease, error: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.finish(lease, JobStatus::Failed, |job| {
            job.error = Some(error.to_string());
        })
    }

    async fn request_cancel(&self, id: JobId) -> Result<CancelOutcome, QueueError> {
        let mut state = self.state.lock().await;
        let entry = state.jobs.get_mut(&id).ok_or(QueueError::NotFound(id))?;
        match entry.job.status {
            JobStatus::Queued => {
                entry.transition(JobStatus::Failed)?;
                entry.job.error = Some(CANCELLED_MESSAGE.to_string());
                Ok(CancelOutcome::Cancelled)
            }
            JobStatus::Active => {
                entry.cancel_requested = true;
                Ok(CancelOutcome::Requested)
            }
            JobStatus::Completed | JobStatus::Failed => Err(QueueError::AlreadyTerminal(id)),
        }
    }

    async fn is_cancel_requested(&self, id: JobId) -> Result<bool, QueueError> {
        self.state
            .lock()
            .await
            .jobs
            .get(&id)
            .map(|e| e.cancel_requested)
            .ok_or(QueueError::NotFound(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
