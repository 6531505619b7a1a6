//! Scene images through the Stability AI Stable Image Core endpoint.

use async_trait::async_trait;
use serde::Deserialize;

use crate::capability::ImageGenerator;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::http::{build_client, parse_json, request_error};

/// Style suffix appended to every scene description.
const STYLE_SUFFIX: &str = "cinematic lighting";

/// [`ImageGenerator`] backed by `POST /v2beta/stable-image/generate/core`.
///
/// Requests a JSON response so the PNG arrives base64-encoded and can be
/// returned as a `data:image/png;base64,...` reference.
pub struct StabilityImageGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    image: Option<String>,
    finish_reason: Option<String>,
}

impl StabilityImageGenerator {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: build_client(),
            base_url,
            api_key,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.stability_base_url.clone(),
            config.stability_api_key.clone(),
        )
    }
}

#[async_trait]
impl ImageGenerator for StabilityImageGenerator {
    async fn generate(&self, description: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("STABILITY_API_KEY"))?;

        let form = reqwest::multipart::Form::new()
            .text("prompt", format!("{description}, {STYLE_SUFFIX}"))
            .text("output_format", "png");

        let response = self
            .client
            .post(format!("{}/v2beta/stable-image/generate/core", self.base_url))
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;

        let body: ImageResponse = parse_json(response).await?;

        if let Some(reason) = body.finish_reason.as_deref() {
            if reason != "SUCCESS" {
                return Err(ProviderError::Malformed(format!(
                    "image generation finished with {reason}"
                )));
            }
        }

        body.image
            .filter(|b64| !b64.is_empty())
            .map(|b64| format!("data:image/png;base64,{b64}"))
            .ok_or_else(|| ProviderError::Malformed("response carried no image".into()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::routing::post;
    use axum::{Json, Router};

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
    async fn wraps_base64_image_in_data_uri() {
        let app = Router::new().route(
            "/v2beta/stable-image/generate/core",
            post(|| async {
                Json(serde_json::json!({ "image": "iVBORw0KGgo=", "finish_reason": "SUCCESS" }))
            }),
        );
        let generator = StabilityImageGenerator::new(serve(app).await, Some("key".into()));

        let image = generator.generate("a robot at an easel").await.unwrap();
        assert_eq!(image, "data:image/png;base64,iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn filtered_content_is_malformed() {
        let app = Router::new().route(
            "/v2beta/stable-image/generate/core",
            post(|| async {
                Json(serde_json::json!({ "image": "", "finish_reason": "CONTENT_FILTERED" }))
            }),
        );
        let generator = StabilityImageGenerator::new(serve(app).await, Some("key".into()));

        assert_matches!(
            generator.generate("x").await,
            Err(ProviderError::Malformed(_))
        );
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let app = Router::new().route(
            "/v2beta/stable-image/generate/core",
            post(|| async { "<html>gateway</html>" }),
        );
        let generator = StabilityImageGenerator::new(serve(app).await, Some("key".into()));

        assert_matches!(
            generator.generate("x").await,
            Err(ProviderError::Malformed(_))
        );
    }
}
