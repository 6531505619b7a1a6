use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::elevenlabs::ElevenLabsVoiceSynthesizer;
use crate::error::ProviderError;
use crate::openai::OpenAiTextGenerator;
use crate::stability::StabilityImageGenerator;

/// Generates a script from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Generates an image for a scene description and returns a reference to it
/// (URL or `data:` URI).
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, description: &str) -> Result<String, ProviderError>;
}

/// Synthesizes narration for a piece of text and returns a reference to the
/// audio.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<String, ProviderError>;
}

/// The three capabilities the pipeline needs, shared by every worker.
#[derive(Clone)]
pub struct Providers {
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    pub voice: Arc<dyn VoiceSynthesizer>,
}

impl Providers {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        image: Arc<dyn ImageGenerator>,
        voice: Arc<dyn VoiceSynthesizer>,
    ) -> Self {
        Self { text, image, voice }
    }

    /// Build the HTTP adapters for OpenAI, Stability and ElevenLabs.
    ///
    /// Adapters without an API key are still constructed; their calls fail
    /// with [`ProviderError::NotConfigured`] and the pipeline degrades.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            text: Arc::new(OpenAiTextGenerator::from_config(config)),
            image: Arc::new(StabilityImageGenerator::from_config(config)),
            voice: Arc::new(ElevenLabsVoiceSynthesizer::from_config(config)),
        }
    }
}
