use std::time::Duration;

/// Placeholder image used when image generation fails.
pub const DEFAULT_IMAGE_PLACEHOLDER: &str =
    "https://placehold.co/1024x576/png?text=Scene+image+unavailable";

/// Substitute values used when a media call degrades.
///
/// `None` leaves the scene field `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub image: Option<String>,
    pub audio: Option<String>,
}

impl Default for FallbackPolicy {
    /// Placeholder for images, `null` for audio.
    fn default() -> Self {
        Self {
            image: Some(DEFAULT_IMAGE_PLACEHOLDER.to_string()),
            audio: None,
        }
    }
}

/// Executor tuning loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Budget for each individual provider call (default: 60s).
    pub provider_timeout: Duration,
    /// Scenes whose media may be generated at the same time (default: 3).
    pub scene_concurrency: usize,
    pub fallback: FallbackPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(60),
            scene_concurrency: 3,
            fallback: FallbackPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                          |
    /// |-------------------------|----------------------------------|
    /// | `PROVIDER_TIMEOUT_SECS` | `60`                             |
    /// | `SCENE_CONCURRENCY`     | `3`                              |
    /// | `IMAGE_PLACEHOLDER_URL` | placehold.co image; empty = null |
    /// | `AUDIO_PLACEHOLDER_URL` | unset = null                     |
    pub fn from_env() -> Self {
        let provider_timeout_secs: u64 = std::env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("PROVIDER_TIMEOUT_SECS must be a valid u64");

        let scene_concurrency: usize = std::env::var("SCENE_CONCURRENCY")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("SCENE_CONCURRENCY must be a valid usize");

        let image = match std::env::var("IMAGE_PLACEHOLDER_URL") {
            Ok(url) => Some(url).filter(|u| !u.trim().is_empty()),
            Err(_) => Some(DEFAULT_IMAGE_PLACEHOLDER.to_string()),
        };
        let audio = std::env::var("AUDIO_PLACEHOLDER_URL")
            .ok()
            .filter(|u| !u.trim().is_empty());

        Self {
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            scene_concurrency: scene_concurrency.max(1),
            fallback: FallbackPolicy { image, audio },
        }
    }
}
