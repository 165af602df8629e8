//! HTTP access to the two remote collaborators.
//!
//! - `AiService`: `/validate` and `/detect` take a multipart `image` field.
//! - `Backend`: patient CRUD, report history, analytics aggregates and the
//!   stage-3 vitamin analysis.
//!
//! Each call is a single attempt. Transport failures map to
//! `ClientError::Network`, non-2xx responses to `ClientError::Server` with
//! the body's `error` or `message` field when present.

pub mod ai_service;
pub mod backend;
pub mod mock;

#[cfg(test)]
pub(crate) mod fake_server;

pub use ai_service::*;
pub use backend::*;
pub use mock::*;

use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::models::{
    AnalysisResult, Analytics, DetectionResult, HealthReport, Patient, PatientDraft, Report,
    ValidationResult,
};
use crate::upload::ImageUpload;

/// Image validation and disease detection.
#[allow(async_fn_in_trait)]
pub trait AiService {
    async fn validate(&self, image: &ImageUpload) -> Result<ValidationResult, ClientError>;

    async fn detect(&self, image: &ImageUpload) -> Result<DetectionResult, ClientError>;

    async fn health(&self) -> Result<HealthReport, ClientError>;
}

/// Patient records, reports, analytics and vitamin analysis.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn list_patients(&self) -> Result<Vec<Patient>, ClientError>;

    async fn get_patient(&self, patient_id: &str) -> Result<Patient, ClientError>;

    /// Returns the identifier assigned by the backend.
    async fn create_patient(&self, draft: &PatientDraft) -> Result<String, ClientError>;

    async fn update_patient(&self, patient_id: &str, draft: &PatientDraft)
        -> Result<(), ClientError>;

    async fn delete_patient(&self, patient_id: &str) -> Result<(), ClientError>;

    /// Newest first.
    async fn reports(&self, patient_id: &str) -> Result<Vec<Report>, ClientError>;

    async fn analytics(&self, patient_id: &str) -> Result<Analytics, ClientError>;

    async fn analyze_stage3(
        &self,
        patient_id: &str,
        disease: &str,
        confidence: f64,
    ) -> Result<AnalysisResult, ClientError>;

    async fn health(&self) -> Result<HealthReport, ClientError>;
}

impl<T: AiService> AiService for &T {
    async fn validate(&self, image: &ImageUpload) -> Result<ValidationResult, ClientError> {
        (**self).validate(image).await
    }

    async fn detect(&self, image: &ImageUpload) -> Result<DetectionResult, ClientError> {
        (**self).detect(image).await
    }

    async fn health(&self) -> Result<HealthReport, ClientError> {
        (**self).health().await
    }
}

impl<T: Backend> Backend for &T {
    async fn list_patients(&self) -> Result<Vec<Patient>, ClientError> {
        (**self).list_patients().await
    }

    async fn get_patient(&self, patient_id: &str) -> Result<Patient, ClientError> {
        (**self).get_patient(patient_id).await
    }

    async fn create_patient(&self, draft: &PatientDraft) -> Result<String, ClientError> {
        (**self).create_patient(draft).await
    }

    async fn update_patient(&self, patient_id: &str, draft: &PatientDraft)
        -> Result<(), ClientError> {
        (**self).update_patient(patient_id, draft).await
    }

    async fn delete_patient(&self, patient_id: &str) -> Result<(), ClientError> {
        (**self).delete_patient(patient_id).await
    }

    async fn reports(&self, patient_id: &str) -> Result<Vec<Report>, ClientError> {
        (**self).reports(patient_id).await
    }

    async fn analytics(&self, patient_id: &str) -> Result<Analytics, ClientError> {
        (**self).analytics(patient_id).await
    }

    async fn analyze_stage3(
        &self,
        patient_id: &str,
        disease: &str,
        confidence: f64,
    ) -> Result<AnalysisResult, ClientError> {
        (**self).analyze_stage3(patient_id, disease, confidence).await
    }

    async fn health(&self) -> Result<HealthReport, ClientError> {
        (**self).health().await
    }
}

/// Shared reqwest client with the configured timeouts.
pub(crate) fn build_http_client(
    request_timeout: std::time::Duration,
) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .connect_timeout(crate::config::CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .user_agent(format!("{}/{}", crate::config::APP_NAME, crate::config::APP_VERSION))
        .build()
        .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {e}")))
}

/// Fail on non-2xx, otherwise return the response untouched.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message_from_body(&body);
    tracing::warn!(status = status.as_u16(), message = %message, "Request rejected");

    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Check status and decode a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    let status = response.status().as_u16();
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Server {
        status,
        message: format!("Malformed response: {e}"),
    })
}

/// Pull a human message out of an error body: `error`, then `message`,
/// then the raw text.
pub(crate) fn error_message_from_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["error", "message"] {
            if let Some(msg) = value.get(field).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.trim().chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_wins() {
        let msg = error_message_from_body(r#"{"error":"Patient not found","message":"other"}"#);
        assert_eq!(msg, "Patient not found");
    }

    #[test]
    fn message_field_used_when_no_error() {
        let msg = error_message_from_body(r#"{"valid":false,"message":"No image provided"}"#);
        assert_eq!(msg, "No image provided");
    }

    #[test]
    fn raw_body_is_truncated() {
        let body = "x".repeat(500);
        assert_eq!(error_message_from_body(&body).len(), 200);
    }

    #[test]
    fn empty_body_gives_empty_message() {
        assert_eq!(error_message_from_body(""), "");
    }
}
