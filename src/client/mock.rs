//! Scripted clients for exercising orchestration without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AiService, Backend};
use crate::error::ClientError;
use crate::models::{
    AnalysisResult, Analytics, DetectionResult, HealthReport, Patient, PatientDraft, Report,
    ValidationResult,
};
use crate::upload::ImageUpload;

/// A failure a mock should produce instead of a value.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Network,
    Server(u16, String),
}

impl MockFailure {
    fn to_error(&self) -> ClientError {
        match self {
            Self::Network => ClientError::Network("mock: connection refused".into()),
            Self::Server(status, message) => ClientError::Server {
                status: *status,
                message: message.clone(),
            },
        }
    }
}

type Reply<T> = Mutex<Result<T, MockFailure>>;

fn reply<T: Clone>(slot: &Reply<T>) -> Result<T, ClientError> {
    match slot.lock() {
        Ok(guard) => guard.clone().map_err(|f| f.to_error()),
        Err(_) => Err(ClientError::Network("mock: lock poisoned".into())),
    }
}

// ═══════════════════════════════════════════════════════════
// MockAiService
// ═══════════════════════════════════════════════════════════

/// AI service returning configured responses and counting calls.
pub struct MockAiService {
    validation: Reply<ValidationResult>,
    detection: Reply<DetectionResult>,
    healthy: bool,
    validate_calls: AtomicUsize,
    detect_calls: AtomicUsize,
}

impl MockAiService {
    pub fn new() -> Self {
        Self {
            validation: Mutex::new(Ok(ValidationResult {
                valid: true,
                caption: Some("a close up of skin".into()),
                reason: Some("Biological content detected".into()),
                message: None,
            })),
            detection: Mutex::new(Ok(DetectionResult {
                disease: Some("eczema".into()),
                confidence: 0.87,
                success: Some(true),
            })),
            healthy: true,
            validate_calls: AtomicUsize::new(0),
            detect_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_validation(self, result: ValidationResult) -> Self {
        self.set_validation(Ok(result));
        self
    }

    pub fn with_detection(self, result: DetectionResult) -> Self {
        self.set_detection(Ok(result));
        self
    }

    pub fn failing_validation(self, failure: MockFailure) -> Self {
        self.set_validation(Err(failure));
        self
    }

    pub fn failing_detection(self, failure: MockFailure) -> Self {
        self.set_detection(Err(failure));
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn set_validation(&self, result: Result<ValidationResult, MockFailure>) {
        if let Ok(mut slot) = self.validation.lock() {
            *slot = result;
        }
    }

    pub fn set_detection(&self, result: Result<DetectionResult, MockFailure>) {
        if let Ok(mut slot) = self.detection.lock() {
            *slot = result;
        }
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockAiService {
    fn default() -> Self {
        Self::new()
    }
}

impl AiService for MockAiService {
    async fn validate(&self, _image: &ImageUpload) -> Result<ValidationResult, ClientError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        reply(&self.validation)
    }

    async fn detect(&self, _image: &ImageUpload) -> Result<DetectionResult, ClientError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        reply(&self.detection)
    }

    async fn health(&self) -> Result<HealthReport, ClientError> {
        if self.healthy {
            Ok(HealthReport {
                status: "healthy".into(),
                service: Some("ai".into()),
            })
        } else {
            Err(MockFailure::Network.to_error())
        }
    }
}

// ═══════════════════════════════════════════════════════════
// MockBackend
// ═══════════════════════════════════════════════════════════

/// In-memory backend with a patient list and scripted analysis replies.
pub struct MockBackend {
    patients: Mutex<Vec<Patient>>,
    reports: Mutex<Vec<Report>>,
    analytics: Reply<Analytics>,
    analysis: Reply<AnalysisResult>,
    list_failure: Mutex<Option<MockFailure>>,
    healthy: bool,
    analyze_calls: Mutex<Vec<(String, String, f64)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            patients: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
            analytics: Mutex::new(Ok(Analytics::default())),
            analysis: Mutex::new(Ok(AnalysisResult {
                status: "success".into(),
                report_id: Some(1),
                detected_disease: None,
                confidence: None,
                nutrition_recommendations: Vec::new(),
                message: None,
            })),
            list_failure: Mutex::new(None),
            healthy: true,
            analyze_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_patient(self, id: &str, name: &str) -> Self {
        if let Ok(mut patients) = self.patients.lock() {
            patients.push(Patient {
                id: id.to_string(),
                name: name.to_string(),
                phone: None,
                date_of_birth: None,
                address: None,
                created_at: "2024-01-15 10:30:00".into(),
            });
        }
        self
    }

    pub fn with_reports(self, reports: Vec<Report>) -> Self {
        if let Ok(mut slot) = self.reports.lock() {
            *slot = reports;
        }
        self
    }

    pub fn with_analytics(self, analytics: Analytics) -> Self {
        if let Ok(mut slot) = self.analytics.lock() {
            *slot = Ok(analytics);
        }
        self
    }

    pub fn failing_analytics(self, failure: MockFailure) -> Self {
        if let Ok(mut slot) = self.analytics.lock() {
            *slot = Err(failure);
        }
        self
    }

    pub fn with_analysis(self, result: AnalysisResult) -> Self {
        self.set_analysis(Ok(result));
        self
    }

    pub fn failing_list(self, failure: MockFailure) -> Self {
        if let Ok(mut slot) = self.list_failure.lock() {
            *slot = Some(failure);
        }
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn set_analysis(&self, result: Result<AnalysisResult, MockFailure>) {
        if let Ok(mut slot) = self.analysis.lock() {
            *slot = result;
        }
    }

    /// `(patient_id, disease, confidence)` for every stage-3 call.
    pub fn analyze_calls(&self) -> Vec<(String, String, f64)> {
        self.analyze_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn patient_ids(&self) -> Vec<String> {
        self.patients
            .lock()
            .map(|p| p.iter().map(|p| p.id.clone()).collect())
            .unwrap_or_default()
    }

    fn poisoned() -> ClientError {
        ClientError::Network("mock: lock poisoned".into())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MockBackend {
    async fn list_patients(&self) -> Result<Vec<Patient>, ClientError> {
        if let Some(failure) = self.list_failure.lock().map_err(|_| Self::poisoned())?.as_ref() {
            return Err(failure.to_error());
        }
        Ok(self.patients.lock().map_err(|_| Self::poisoned())?.clone())
    }

    async fn get_patient(&self, patient_id: &str) -> Result<Patient, ClientError> {
        self.patients
            .lock()
            .map_err(|_| Self::poisoned())?
            .iter()
            .find(|p| p.id == patient_id)
            .cloned()
            .ok_or(ClientError::Server {
                status: 404,
                message: "Patient not found".into(),
            })
    }

    async fn create_patient(&self, draft: &PatientDraft) -> Result<String, ClientError> {
        let mut patients = self.patients.lock().map_err(|_| Self::poisoned())?;
        let id = format!("PAVIT-{:05}", patients.len());
        patients.push(Patient {
            id: id.clone(),
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            date_of_birth: draft.date_of_birth.clone(),
            address: draft.address.clone(),
            created_at: "2024-06-01 08:00:00".into(),
        });
        Ok(id)
    }

    async fn update_patient(
        &self,
        patient_id: &str,
        draft: &PatientDraft,
    ) -> Result<(), ClientError> {
        let mut patients = self.patients.lock().map_err(|_| Self::poisoned())?;
        if let Some(p) = patients.iter_mut().find(|p| p.id == patient_id) {
            p.name = draft.name.clone();
            p.phone = draft.phone.clone();
            p.date_of_birth = draft.date_of_birth.clone();
            p.address = draft.address.clone();
        }
        Ok(())
    }

    async fn delete_patient(&self, patient_id: &str) -> Result<(), ClientError> {
        self.patients
            .lock()
            .map_err(|_| Self::poisoned())?
            .retain(|p| p.id != patient_id);
        Ok(())
    }

    async fn reports(&self, patient_id: &str) -> Result<Vec<Report>, ClientError> {
        Ok(self
            .reports
            .lock()
            .map_err(|_| Self::poisoned())?
            .iter()
            .filter(|r| r.patient_id.as_deref().map_or(true, |id| id == patient_id))
            .cloned()
            .collect())
    }

    async fn analytics(&self, _patient_id: &str) -> Result<Analytics, ClientError> {
        reply(&self.analytics)
    }

    async fn analyze_stage3(
        &self,
        patient_id: &str,
        disease: &str,
        confidence: f64,
    ) -> Result<AnalysisResult, ClientError> {
        if let Ok(mut calls) = self.analyze_calls.lock() {
            calls.push((patient_id.to_string(), disease.to_string(), confidence));
        }
        reply(&self.analysis)
    }

    async fn health(&self) -> Result<HealthReport, ClientError> {
        if self.healthy {
            Ok(HealthReport {
                status: "healthy".into(),
                service: Some("backend".into()),
            })
        } else {
            Err(MockFailure::Network.to_error())
        }
    }
}
