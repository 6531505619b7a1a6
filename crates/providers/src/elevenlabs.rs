//! Scene narration through the ElevenLabs text-to-speech API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::capability::VoiceSynthesizer;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::http::{build_client, ensure_success, request_error};

/// [`VoiceSynthesizer`] backed by `POST /v1/text-to-speech/{voice_id}`.
///
/// The MPEG body is returned inline as a `data:audio/mpeg;base64,...`
/// reference.
pub struct ElevenLabsVoiceSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    voice_id: String,
}

impl ElevenLabsVoiceSynthesizer {
    pub fn new(base_url: String, api_key: Option<String>, voice_id: String) -> Self {
        Self {
            client: build_client(),
            base_url,
            api_key,
            voice_id,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.elevenlabs_base_url.clone(),
            config.elevenlabs_api_key.clone(),
            config.elevenlabs_voice_id.clone(),
        )
    }
}

#[async_trait]
impl VoiceSynthesizer for ElevenLabsVoiceSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("ELEVENLABS_API_KEY"))?;

        let response = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.base_url, self.voice_id
            ))
            .header("xi-api-key", api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(request_error)?;

        let audio = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(request_error)?;

        if audio.is_empty() {
            return Err(ProviderError::Malformed("empty audio body".into()));
        }

        Ok(format!("data:audio/mpeg;base64,{}", STANDARD.encode(&audio)))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn encodes_audio_bytes_as_data_uri() {
        let app = Router::new().route(
            "/v1/text-to-speech/{voice}",
            post(|Path(voice): Path<String>, headers: HeaderMap| async move {
                assert_eq!(voice, "narrator");
                assert_eq!(headers["xi-api-key"], "xi");
                vec![0xFFu8, 0xFB, 0x90]
            }),
        );
        let synth =
            ElevenLabsVoiceSynthesizer::new(serve(app).await, Some("xi".into()), "narrator".into());

        let audio = synth.synthesize("Scene one").await.unwrap();
        assert_eq!(audio, "data:audio/mpeg;base64,//uQ");
    }

    #[tokio::test]
    async fn unauthorized_is_api_error() {
        let app = Router::new().route(
            "/v1/text-to-speech/{voice}",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let synth = ElevenLabsVoiceSynthesizer::new(serve(app).await, Some("xi".into()), "v".into());

        assert_matches!(
            synth.synthesize("x").await,
            Err(ProviderError::Api { status: 401, .. })
        );
    }

    #[tokio::test]
    async fn empty_body_is_malformed() {
        let app = Router::new().route(
            "/v1/text-to-speech/{voice}",
            post(|| async { Vec::<u8>::new() }),
        );
        let synth = ElevenLabsVoiceSynthesizer::new(serve(app).await, Some("xi".into()), "v".into());

        assert_matches!(
            synth.synthesize("x").await,
            Err(ProviderError::Malformed(_))
        );
    }
}
