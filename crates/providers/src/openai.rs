//! Script generation through the OpenAI chat completions API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::capability::TextGenerator;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::http::{build_client, parse_json, request_error};

const SYSTEM_PROMPT: &str =
    "You are a creative film screenwriter generating short AI film scripts.";

/// [`TextGenerator`] backed by `POST /v1/chat/completions`.
pub struct OpenAiTextGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiTextGenerator {
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: build_client(),
            base_url,
            api_key,
            model,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        )
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("OPENAI_API_KEY"))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!("Create a short 3-scene concept for: {prompt}") },
            ],
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let completion: ChatCompletion = parse_json(response).await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::Malformed("completion carried no content".into()))
    }
}
