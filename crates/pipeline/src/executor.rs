//! Staged execution of one claimed job.
//!
//! 1. Script: text provider -> segmented scenes (fallback template on failure).
//! 2. Media: image + narration per scene, fanned out with a concurrency cap.
//! 3. Finalize: scenes reassembled in script order and stored on the job.
//!
//! Every queue write goes through the job's [`Lease`], so an executor whose
//! lease was reclaimed stops at its next write with
//! [`PipelineError::LeaseLost`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reelforge_core::episode::{Episode, Scene};
use reelforge_core::progress::{media_progress, PROGRESS_SCRIPT_DONE};
use reelforge_core::script::{default_title, fallback_script, segment_script, SceneText};
use reelforge_providers::{ProviderError, Providers};
use reelforge_queue::{JobQueue, Lease};
use tracing::Instrument;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::outcome::{with_timeout, Outcome};

/// Output of the script stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub title: String,
    /// Raw script text the scenes were segmented from.
    pub text: String,
    pub scenes: Vec<SceneText>,
}

impl Script {
    /// Segment `text`, returning `None` when it holds no usable scene.
    fn parse(prompt: &str, text: String) -> Option<Self> {
        let draft = segment_script(&text);
        if draft.scenes.is_empty() {
            return None;
        }
        Some(Self {
            title: draft.title.unwrap_or_else(|| default_title(prompt)),
            text,
            scenes: draft.scenes,
        })
    }

    /// The fixed three-scene script built around the prompt.
    pub fn fallback(prompt: &str) -> Self {
        let text = fallback_script(prompt);
        let draft = segment_script(&text);
        Self {
            title: draft.title.unwrap_or_else(|| default_title(prompt)),
            text,
            scenes: draft.scenes,
        }
    }
}

/// Runs the pipeline stages for claimed jobs.
pub struct PipelineExecutor {
    providers: Providers,
    queue: Arc<dyn JobQueue>,
    config: PipelineConfig,
}

impl PipelineExecutor {
    pub fn new(providers: Providers, queue: Arc<dyn JobQueue>, config: PipelineConfig) -> Self {
        Self {
            providers,
            queue,
            config,
        }
    }

    /// Execute every stage for `lease` and store the finished episode.
    ///
    /// Provider failures never surface here. The run ends early only when
    /// the job is cancelled or a queue write fails (including a lost lease).
    pub async fn run(&self, lease: &Lease) -> Result<Episode, PipelineError> {
        let span = tracing::info_span!("pipeline", job_id = %lease.job_id, attempt = lease.attempt);
        self.run_stages(lease).instrument(span).await
    }

    async fn run_stages(&self, lease: &Lease) -> Result<Episode, PipelineError> {
        self.ensure_not_cancelled(lease).await?;

        let script = self.script_stage(&lease.prompt).await;
        if let Outcome::Degraded { cause, .. } = &script {
            tracing::warn!(error = %cause, "Script generation degraded to fallback template");
        }
        let script = script.into_value();
        tracing::info!(scenes = script.scenes.len(), title = %script.title, "Script ready");
        self.queue.report_progress(lease, PROGRESS_SCRIPT_DONE).await?;

        let scenes = self.media_stage(lease, script.scenes).await?;

        let episode = Episode {
            title: script.title,
            script: script.text,
            scenes,
        };
        self.queue.complete(lease, &episode).await?;
        tracing::info!(scenes = episode.scenes.len(), "Episode stored");
        Ok(episode)
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// Generate and segment the script for `prompt`.
    ///
    /// A failed or timed-out call, or text without any scene, degrades to
    /// [`Script::fallback`].
    pub async fn script_stage(&self, prompt: &str) -> Outcome<Script> {
        let generated = with_timeout(
            self.config.provider_timeout,
            self.providers.text.generate(prompt),
        )
        .await;

        let parsed = generated.and_then(|text| {
            Script::parse(prompt, text)
                .ok_or_else(|| ProviderError::Malformed("script contained no scenes".into()))
        });
        Outcome::from_result(parsed, || Script::fallback(prompt))
    }

    /// Generate media for every scene, at most `scene_concurrency` at once.
    ///
    /// Scenes are returned in input order whatever order they finish in.
    /// Cancellation is observed before a scene starts and after each one
    /// finishes.
    async fn media_stage(
        &self,
        lease: &Lease,
        scenes: Vec<SceneText>,
    ) -> Result<Vec<Scene>, PipelineError> {
        let total = scenes.len();
        let mut finished: Vec<(usize, Scene)> = Vec::with_capacity(total);

        let mut pending = stream::iter(scenes.into_iter().enumerate())
            .map(move |(index, text)| async move {
                match self.queue.is_cancel_requested(lease.job_id).await {
                    Ok(true) => Ok(None),
                    Ok(false) => Ok(Some((index, self.scene_media(index, text).await))),
                    Err(e) => Err(PipelineError::from(e)),
                }
            })
            .buffer_unordered(self.config.scene_concurrency.max(1));

        while let Some(next) = pending.next().await {
            let Some((index, scene)) = next? else {
                tracing::info!(
                    completed = finished.len(),
                    total,
                    "Cancellation requested; stopping before the next scene",
                );
                return Err(PipelineError::Cancelled);
            };
            finished.push((index, scene));
            let progress = media_progress(finished.len(), total);
            self.queue.report_progress(lease, progress).await?;
            tracing::debug!(scene = index + 1, progress, "Scene media ready");

            // In-flight scenes passed their start check long ago.
            if self.queue.is_cancel_requested(lease.job_id).await? {
                tracing::info!(
                    completed = finished.len(),
                    total,
                    "Cancellation requested; discarding generated scenes",
                );
                return Err(PipelineError::Cancelled);
            }
        }

        finished.sort_by_key(|(index, _)| *index);
        Ok(finished.into_iter().map(|(_, scene)| scene).collect())
    }

    /// Image and narration for one scene, generated concurrently.
    ///
    /// Each call is isolated: a failure replaces only that field with the
    /// configured fallback.
    pub async fn scene_media(&self, index: usize, text: SceneText) -> Scene {
        let timeout = self.config.provider_timeout;
        let (image, audio) = tokio::join!(
            with_timeout(timeout, self.providers.image.generate(&text.description)),
            with_timeout(timeout, self.providers.voice.synthesize(&text.description)),
        );

        let fallback = &self.config.fallback;
        let image = Outcome::from_result(image.map(Some), || fallback.image.clone());
        let audio = Outcome::from_result(audio.map(Some), || fallback.audio.clone());

        if let Outcome::Degraded { cause, .. } = &image {
            tracing::warn!(scene = index + 1, error = %cause, "Image generation degraded");
        }
        if let Outcome::Degraded { cause, .. } = &audio {
            tracing::warn!(scene = index + 1, error = %cause, "Narration synthesis degraded");
        }

        Scene {
            description: text.description,
            image: image.into_value(),
            audio: audio.into_value(),
            dialogue: text.dialogue,
        }
    }

    async fn ensure_not_cancelled(&self, lease: &Lease) -> Result<(), PipelineError> {
        if self.queue.is_cancel_requested(lease.job_id).await? {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }
}
