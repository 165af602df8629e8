use reqwest::multipart::Form;
use reqwest::Url;

use super::{build_http_client, check_status, read_json, Backend};
use crate::config::ServiceConfig;
use crate::error::ClientError;
use crate::models::{
    AnalysisResult, Analytics, CreatedPatient, HealthReport, Patient, PatientDraft,
    PatientUpdate, Report,
};

/// reqwest client for the backend REST API.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client: build_http_client(config.request_timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Validation(format!("Invalid backend URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("Backend URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Backend for BackendClient {
    async fn list_patients(&self) -> Result<Vec<Patient>, ClientError> {
        let url = self.endpoint(&["patients", "all"])?;
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    async fn get_patient(&self, patient_id: &str) -> Result<Patient, ClientError> {
        let url = self.endpoint(&["patients", patient_id])?;
        let response = self.client.get(url).send().await?;
        read_json(response).await.map_err(|e| match e {
            ClientError::Server { status: 404, .. } => ClientError::Server {
                status: 404,
                message: "Patient not found".into(),
            },
            other => other,
        })
    }

    async fn create_patient(&self, draft: &PatientDraft) -> Result<String, ClientError> {
        let url = self.endpoint(&["patients", "create"])?;
        let response = self.client.post(url).json(draft).send().await?;
        let created: CreatedPatient = read_json(response).await?;
        tracing::info!(patient_id = %created.patient_id, "Patient created");
        Ok(created.patient_id)
    }

    async fn update_patient(
        &self,
        patient_id: &str,
        draft: &PatientDraft,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["patients", "update"])?;
        let body = PatientUpdate { patient_id, draft };
        let response = self.client.put(url).json(&body).send().await?;
        check_status(response).await?;
        tracing::info!(patient_id, "Patient updated");
        Ok(())
    }

    async fn delete_patient(&self, patient_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["patients", patient_id])?;
        let response = self.client.delete(url).send().await?;
        check_status(response).await?;
        tracing::info!(patient_id, "Patient deleted");
        Ok(())
    }

    async fn reports(&self, patient_id: &str) -> Result<Vec<Report>, ClientError> {
        let url = self.endpoint(&["reports", patient_id])?;
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    async fn analytics(&self, patient_id: &str) -> Result<Analytics, ClientError> {
        let url = self.endpoint(&["analytics", patient_id])?;
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    async fn analyze_stage3(
        &self,
        patient_id: &str,
        disease: &str,
        confidence: f64,
    ) -> Result<AnalysisResult, ClientError> {
        let url = self.endpoint(&["analyze_stage3"])?;
        let form = Form::new()
            .text("patient_id", patient_id.to_string())
            .text("disease", disease.to_string())
            .text("confidence", confidence.to_string());

        let response = self.client.post(url).multipart(form).send().await?;
        read_json(response).await
    }

    async fn health(&self) -> Result<HealthReport, ClientError> {
        let url = self.endpoint(&["health"])?;
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }
}
