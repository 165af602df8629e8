use crate::client::{AiService, Backend};
use crate::error::ClientError;
use crate::models::{
    normalize_patient_id, AnalysisResult, DetectionResult, SelectedPatient, ValidationResult,
};
use crate::notice::{NoticeCenter, NoticeKind};
use crate::upload::ImageUpload;

use super::session::{DiagnosticSession, DiagnosticState, Stage};

/// Drives a [`DiagnosticSession`] through validation, detection and
/// vitamin analysis.
///
/// Each stage method returns `Ok(None)` when its preconditions are not met
/// (including while another stage is running), `Ok(Some(_))` with the stage
/// result on success, and `Err` after surfacing the failure as a notice.
/// The session stays usable after any failure.
pub struct DiagnosticOrchestrator<A, B> {
    ai: A,
    backend: B,
    session: DiagnosticSession,
    notices: NoticeCenter,
}

impl<A: AiService, B: Backend> DiagnosticOrchestrator<A, B> {
    pub fn new(ai: A, backend: B) -> Self {
        Self {
            ai,
            backend,
            session: DiagnosticSession::default(),
            notices: NoticeCenter::new(),
        }
    }

    pub fn session(&self) -> &DiagnosticSession {
        &self.session
    }

    pub fn state(&self) -> DiagnosticState {
        self.session.state()
    }

    pub fn notices(&mut self) -> &mut NoticeCenter {
        &mut self.notices
    }

    pub fn ai(&self) -> &A {
        &self.ai
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Record the patient this run is for. Re-selecting the same patient is
    /// a no-op; switching patients keeps the attached image.
    pub fn select_patient(&mut self, mut patient: SelectedPatient) -> Result<(), ClientError> {
        patient.patient_id = match normalize_patient_id(&patient.patient_id) {
            Ok(id) => id,
            Err(e) => {
                self.notices.push_error(&e);
                return Err(e);
            }
        };

        if self.session.patient.as_ref() == Some(&patient) {
            return Ok(());
        }

        tracing::info!(patient_id = %patient.patient_id, "Patient selected");
        self.session.patient = Some(patient);
        self.notices.push(NoticeKind::Success, "Patient selected successfully");
        Ok(())
    }

    /// Attach an image, replacing any previous one and discarding results
    /// derived from it. A rejected image leaves the session untouched.
    pub fn attach_image(&mut self, image: ImageUpload) -> Result<(), ClientError> {
        if let Err(e) = image.validate() {
            tracing::warn!(
                filename = %image.filename,
                mime = %image.mime_type,
                size = image.size_bytes(),
                "Image rejected"
            );
            self.notices.push_error(&e);
            return Err(e);
        }

        tracing::info!(
            filename = %image.filename,
            size = image.size_bytes(),
            "Image attached"
        );
        self.session.image = Some(image);
        self.session.clear_results();
        Ok(())
    }

    /// Stage 1: ask the AI service whether the image shows biological
    /// content. A failed validation is advisory and does not block stage 2.
    pub async fn run_stage1(&mut self) -> Result<Option<ValidationResult>, ClientError> {
        if !self.session.can_validate() {
            tracing::debug!(state = ?self.session.state(), "Stage 1 preconditions not met");
            return Ok(None);
        }
        let Some(image) = self.session.image.as_ref() else {
            return Ok(None);
        };

        self.session.running = Some(Stage::Validation);
        let outcome = self.ai.validate(image).await;
        let result = self.finish(Stage::Validation, outcome)?;

        self.session.clear_results();
        self.session.stage1_passed = result.valid;
        if result.valid {
            tracing::info!(caption = ?result.caption, "Stage 1 passed");
            self.notices.push(NoticeKind::Success, "Medical image verified");
        } else {
            tracing::info!(reason = ?result.reason, "Stage 1 rejected image");
            let message = result
                .message
                .clone()
                .unwrap_or_else(|| "Image validation failed".to_string());
            self.notices.push(NoticeKind::Error, message);
        }
        self.session.stage1_result = Some(result.clone());
        Ok(Some(result))
    }

    /// Stage 2: disease detection on the attached image.
    ///
    /// Runs after a failed stage 1 as well (admin override).
    pub async fn run_stage2(&mut self) -> Result<Option<DetectionResult>, ClientError> {
        if self.session.in_progress() {
            return Ok(None);
        }
        let Some(image) = self.session.image.as_ref() else {
            tracing::debug!("Stage 2 requires an image");
            return Ok(None);
        };

        let patient_id = self.session.patient.as_ref().map(|p| p.patient_id.as_str());
        if patient_id.is_none() {
            tracing::warn!("Running disease detection without a selected patient");
        }
        if self.session.stage1_result.is_some() && !self.session.stage1_passed {
            tracing::warn!(
                patient_id = patient_id.unwrap_or("none"),
                "Admin override: detection requested after failed validation"
            );
        }

        self.session.running = Some(Stage::Detection);
        let outcome = self.ai.detect(image).await.and_then(|r| {
            if r.disease().is_some() {
                Ok(r)
            } else {
                Err(ClientError::Server {
                    status: 200,
                    message: "Detection failed".into(),
                })
            }
        });
        let result = self.finish(Stage::Detection, outcome)?;

        tracing::info!(
            disease = result.disease().unwrap_or_default(),
            confidence = result.confidence,
            "Stage 2 complete"
        );
        self.session.stage2_result = Some(result.clone());
        self.session.stage3_result = None;
        self.notices.push(NoticeKind::Success, "Disease detected!");
        Ok(Some(result))
    }

    /// Stage 3: vitamin-deficiency analysis for the detected disease.
    pub async fn run_stage3(&mut self) -> Result<Option<AnalysisResult>, ClientError> {
        if self.session.in_progress() {
            return Ok(None);
        }
        let (Some(patient), Some(detection)) =
            (self.session.patient.as_ref(), self.session.stage2_result.as_ref())
        else {
            tracing::debug!("Stage 3 requires a patient and a detected disease");
            return Ok(None);
        };
        let Some(disease) = detection.disease() else {
            return Ok(None);
        };

        self.session.running = Some(Stage::Analysis);
        let outcome = self
            .backend
            .analyze_stage3(&patient.patient_id, disease, detection.confidence)
            .await
            .and_then(|r| {
                if r.is_success() {
                    Ok(r)
                } else {
                    Err(ClientError::Server {
                        status: 200,
                        message: r
                            .message
                            .clone()
                            .unwrap_or_else(|| "Analysis failed".to_string()),
                    })
                }
            });
        let result = self.finish(Stage::Analysis, outcome)?;

        tracing::info!(
            report_id = ?result.report_id,
            recommendations = result.nutrition_recommendations.len(),
            "Stage 3 complete"
        );
        self.session.stage3_result = Some(result.clone());
        self.notices.push(NoticeKind::Success, "Vitamin analysis complete!");
        Ok(Some(result))
    }

    /// Discard everything and return to `Idle`.
    pub fn reset(&mut self) {
        self.session = DiagnosticSession::default();
        self.notices.push(NoticeKind::Info, "Diagnostic session reset");
        tracing::info!("Diagnostic session reset");
    }

    /// Clear the in-progress flag and surface a failure as a notice.
    fn finish<T>(&mut self, stage: Stage, outcome: Result<T, ClientError>) -> Result<T, ClientError> {
        self.session.running = None;
        outcome.map_err(|e| {
            tracing::warn!(stage = stage.number(), kind = ?e.kind(), error = %e, "Stage failed");
            self.notices.push_error(&e);
            e
        })
    }
}
