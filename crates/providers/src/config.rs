/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Default chat model used for scripts.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// Default Stability AI API base URL.
pub const DEFAULT_STABILITY_BASE_URL: &str = "https://api.stability.ai";
/// Default ElevenLabs API base URL.
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
/// ElevenLabs stock voice used when none is configured.
pub const DEFAULT_ELEVENLABS_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

/// Provider endpoints and credentials loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub stability_api_key: Option<String>,
    pub stability_base_url: String,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
    pub elevenlabs_voice_id: String,
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                      |
    /// |-----------------------|------------------------------|
    /// | `OPENAI_API_KEY`      | unset                        |
    /// | `OPENAI_BASE_URL`     | `https://api.openai.com`     |
    /// | `OPENAI_MODEL`        | `gpt-4o-mini`                |
    /// | `STABILITY_API_KEY`   | unset                        |
    /// | `STABILITY_BASE_URL`  | `https://api.stability.ai`   |
    /// | `ELEVENLABS_API_KEY`  | unset                        |
    /// | `ELEVENLABS_BASE_URL` | `https://api.elevenlabs.io`  |
    /// | `ELEVENLABS_VOICE_ID` | `EXAVITQu4vr4xnSDxMaL`       |
    pub fn from_env() -> Self {
        Self {
            openai_api_key: secret("OPENAI_API_KEY"),
            openai_base_url: var_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: var_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            stability_api_key: secret("STABILITY_API_KEY"),
            stability_base_url: var_or("STABILITY_BASE_URL", DEFAULT_STABILITY_BASE_URL),
            elevenlabs_api_key: secret("ELEVENLABS_API_KEY"),
            elevenlabs_base_url: var_or("ELEVENLABS_BASE_URL", DEFAULT_ELEVENLABS_BASE_URL),
            elevenlabs_voice_id: var_or("ELEVENLABS_VOICE_ID", DEFAULT_ELEVENLABS_VOICE_ID),
        }
    }

    /// Names of the providers that have no API key configured.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai_api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        if self.stability_api_key.is_none() {
            missing.push("STABILITY_API_KEY");
        }
        if self.elevenlabs_api_key.is_none() {
            missing.push("ELEVENLABS_API_KEY");
        }
        missing
    }
}

fn secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| default.to_string())
}
