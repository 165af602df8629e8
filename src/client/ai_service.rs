use reqwest::multipart::{Form, Part};

use super::{build_http_client, read_json, AiService};
use crate::config::ServiceConfig;
use crate::error::ClientError;
use crate::models::{DetectionResult, HealthReport, ValidationResult};
use crate::upload::ImageUpload;

/// reqwest client for the AI service.
#[derive(Clone)]
pub struct AiServiceClient {
    base_url: String,
    client: reqwest::Client,
}

impl AiServiceClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: config.ai_url.trim_end_matches('/').to_string(),
            client: build_http_client(config.request_timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn image_form(image: &ImageUpload) -> Result<Form, ClientError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| ClientError::invalid_image(format!("Unusable MIME type: {e}")))?;
        Ok(Form::new().part("image", part))
    }

    async fn post_image<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        image: &ImageUpload,
    ) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(
            url = %url,
            filename = %image.filename,
            size = image.bytes.len(),
            "Uploading image"
        );
        let response = self
            .client
            .post(&url)
            .multipart(Self::image_form(image)?)
            .send()
            .await?;
        read_json(response).await
    }
}

impl AiService for AiServiceClient {
    async fn validate(&self, image: &ImageUpload) -> Result<ValidationResult, ClientError> {
        self.post_image("validate", image).await
    }

    async fn detect(&self, image: &ImageUpload) -> Result<DetectionResult, ClientError> {
        self.post_image("detect", image).await
    }

    async fn health(&self) -> Result<HealthReport, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::client::fake_server::{ai_router, dead_url, AiScript, FakeServer};
    use crate::error::ErrorKind;

    fn client_for(url: String) -> AiServiceClient {
        AiServiceClient::new(&ServiceConfig {
            ai_url: url,
            request_timeout: Duration::from_secs(5),
            ..ServiceConfig::default()
        })
        .unwrap()
    }

    fn jpeg() -> ImageUpload {
        ImageUpload::new("rash.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4])
    }

    #[tokio::test]
    async fn validate_uploads_image_part() {
        let script = AiScript::default();
        let server = FakeServer::start(ai_router(script.clone())).await;
        let client = client_for(server.url(""));

        let result = client.validate(&jpeg()).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.caption.as_deref(), Some("a close up of skin"));

        let received = script.received.lock().unwrap().clone();
        assert_eq!(received, vec![("rash.jpg".to_string(), "image/jpeg".to_string(), 8)]);
    }

    #[tokio::test]
    async fn detect_parses_disease_and_confidence() {
        let server = FakeServer::start(ai_router(AiScript::default())).await;
        let client = client_for(server.url(""));

        let result = client.detect(&jpeg()).await.unwrap();
        assert_eq!(result.disease(), Some("eczema"));
        assert!((result.confidence - 0.87).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn non_2xx_surfaces_server_message() {
        let script = AiScript {
            detect: (StatusCode::INTERNAL_SERVER_ERROR, json!({"message": "model not loaded"})),
            ..AiScript::default()
        };
        let server = FakeServer::start(ai_router(script)).await;
        let client = client_for(server.url(""));

        let err = client.detect(&jpeg()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.user_message(), "model not loaded");
    }

    #[tokio::test]
    async fn malformed_body_is_server_error() {
        let script = AiScript {
            validate: (StatusCode::OK, json!(["not", "an", "object"])),
            ..AiScript::default()
        };
        let server = FakeServer::start(ai_router(script)).await;
        let client = client_for(server.url(""));

        let err = client.validate(&jpeg()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        assert!(err.user_message().starts_with("Malformed response"));
    }

    #[tokio::test]
    async fn unreachable_service_is_network_error() {
        let client = client_for(dead_url().await);
        let err = client.health().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn bad_mime_is_rejected_before_sending() {
        let image = ImageUpload::new("x.jpg", "not a mime", vec![1]);
        assert!(AiServiceClient::image_form(&image).is_err());
    }
}
