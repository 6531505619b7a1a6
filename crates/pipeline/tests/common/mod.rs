//! Scripted providers and queue helpers for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reelforge_core::episode::Episode;
use reelforge_core::job::{Job, JobView};
use reelforge_core::types::JobId;
use reelforge_pipeline::{PipelineConfig, PipelineExecutor};
use reelforge_providers::{
    ImageGenerator, ProviderError, Providers, TextGenerator, VoiceSynthesizer,
};
use reelforge_queue::{CancelOutcome, JobQueue, Lease, MemoryJobQueue, QueueConfig, QueueError};

pub const ROBOT_SCRIPT: &str = "Title: Brushstrokes of Steel\n\n\
    Scene 1: A rusty robot wanders into an abandoned art studio.\n\
    Scene 2: It dips a clumsy claw into blue paint and smears the canvas.\n\
    Scene 3: At dawn the robot steps back from a finished sunrise.";

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

pub enum TextReply {
    Script(String),
    Fail,
    Hang,
}

pub struct FakeText {
    reply: TextReply,
}

impl FakeText {
    pub fn script(text: &str) -> Self {
        Self {
            reply: TextReply::Script(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: TextReply::Fail,
        }
    }

    pub fn hanging() -> Self {
        Self {
            reply: TextReply::Hang,
        }
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        match &self.reply {
            TextReply::Script(text) => Ok(text.clone()),
            TextReply::Fail => Err(ProviderError::Api {
                status: 500,
                body: "upstream exploded".into(),
            }),
            TextReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Timeout)
            }
        }
    }
}

/// Image generator that fails or sleeps for descriptions containing a key.
#[derive(Default)]
pub struct FakeImage {
    failing: Vec<String>,
    delays: HashMap<String, Duration>,
    pub calls: AtomicUsize,
}

impl FakeImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, key: &str) -> Self {
        self.failing.push(key.to_string());
        self
    }

    pub fn delayed(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for FakeImage {
    async fn generate(&self, description: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self
            .delays
            .iter()
            .find(|(key, _)| description.contains(key.as_str()))
            .map(|(_, delay)| *delay)
        {
            tokio::time::sleep(delay).await;
        }
        if self.failing.iter().any(|key| description.contains(key.as_str())) {
            return Err(ProviderError::Malformed("no image in response".into()));
        }
        Ok(format!("https://images.test/{}.png", description.len()))
    }
}

pub struct FakeVoice {
    fail: bool,
}

impl FakeVoice {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl VoiceSynthesizer for FakeVoice {
    async fn synthesize(&self, _text: &str) -> Result<String, ProviderError> {
        if self.fail {
            return Err(ProviderError::NotConfigured("ELEVENLABS_API_KEY"));
        }
        Ok("data:audio/mpeg;base64,//uQ".to_string())
    }
}

pub fn providers(text: FakeText, image: Arc<FakeImage>, voice: FakeVoice) -> Providers {
    Providers::new(Arc::new(text), image, Arc::new(voice))
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Memory queue that records every progress value reported to it.
pub struct RecordingQueue {
    inner: MemoryJobQueue,
    progress: Mutex<Vec<u8>>,
}

impl RecordingQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: MemoryJobQueue::new(config),
            progress: Mutex::new(Vec::new()),
        }
    }

    pub fn reported(&self) -> Vec<u8> {
        self.progress.lock().unwrap().clone()
    }

    pub async fn job(&self, id: JobId) -> Option<Job> {
        self.inner.job(id).await
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, prompt: &str) -> Result<Job, QueueError> {
        self.inner.enqueue(prompt).await
    }

    async fn dequeue(&self) -> Result<Lease, QueueError> {
        self.inner.dequeue().await
    }

    async fn get_status(&self, id: JobId) -> Result<JobView, QueueError> {
        self.inner.get_status(id).await
    }

    async fn heartbeat(&self, lease: &Lease) -> Result<(), QueueError> {
        self.inner.heartbeat(lease).await
    }

    async fn report_progress(&self, lease: &Lease, progress: u8) -> Result<(), QueueError> {
        self.inner.report_progress(lease, progress).await?;
        self.progress.lock().unwrap().push(progress);
        Ok(())
    }

    async fn complete(&self, lease: &Lease, episode: &Episode) -> Result<(), QueueError> {
        self.inner.complete(lease, episode).await
    }

    async fn fail(&self, lease: &Lease, error: &str) -> Result<(), QueueError> {
        self.inner.fail(lease, error).await
    }

    async fn request_cancel(&self, id: JobId) -> Result<CancelOutcome, QueueError> {
        self.inner.request_cancel(id).await
    }

    async fn is_cancel_requested(&self, id: JobId) -> Result<bool, QueueError> {
        self.inner.is_cancel_requested(id).await
    }
}

pub fn quick_queue_config() -> QueueConfig {
    QueueConfig {
        database_url: None,
        lease_duration: Duration::from_secs(30),
        max_attempts: 3,
        poll_interval: Duration::from_millis(20),
    }
}

pub fn pipeline_config(concurrency: usize) -> PipelineConfig {
    PipelineConfig {
        provider_timeout: Duration::from_secs(5),
        scene_concurrency: concurrency,
        ..PipelineConfig::default()
    }
}

pub fn executor(
    providers: Providers,
    queue: Arc<RecordingQueue>,
    config: PipelineConfig,
) -> PipelineExecutor {
    PipelineExecutor::new(providers, queue, config)
}

/// Enqueue `prompt` and claim it straight away.
pub async fn claimed(queue: &RecordingQueue, prompt: &str) -> Lease {
    queue.enqueue(prompt).await.unwrap();
    queue.dequeue().await.unwrap()
}
