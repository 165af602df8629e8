use serde::Serialize;

use crate::models::{AnalysisResult, DetectionResult, SelectedPatient, ValidationResult};
use crate::upload::ImageUpload;

/// One of the three pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Detection,
    Analysis,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Self::Validation => 1,
            Self::Detection => 2,
            Self::Analysis => 3,
        }
    }
}

/// Most advanced condition a session has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticState {
    Idle,
    PatientSelected,
    ImageAttached,
    Stage1Validating,
    Stage1Passed,
    Stage1Failed,
    Stage2Running,
    Stage2Done,
    Stage3Running,
    Stage3Done,
}

/// Transient state of one diagnostic run.
///
/// Created empty, filled in by patient and image selection, mutated by each
/// stage and discarded on reset.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSession {
    pub(crate) patient: Option<SelectedPatient>,
    pub(crate) image: Option<ImageUpload>,
    pub(crate) stage1_passed: bool,
    pub(crate) stage1_result: Option<ValidationResult>,
    pub(crate) stage2_result: Option<DetectionResult>,
    pub(crate) stage3_result: Option<AnalysisResult>,
    pub(crate) running: Option<Stage>,
}

impl DiagnosticSession {
    pub fn state(&self) -> DiagnosticState {
        match self.running {
            Some(Stage::Validation) => return DiagnosticState::Stage1Validating,
            Some(Stage::Detection) => return DiagnosticState::Stage2Running,
            Some(Stage::Analysis) => return DiagnosticState::Stage3Running,
            None => {}
        }

        if self.stage3_result.is_some() {
            DiagnosticState::Stage3Done
        } else if self.stage2_result.is_some() {
            DiagnosticState::Stage2Done
        } else if self.stage1_result.is_some() {
            if self.stage1_passed {
                DiagnosticState::Stage1Passed
            } else {
                DiagnosticState::Stage1Failed
            }
        } else if self.image.is_some() {
            DiagnosticState::ImageAttached
        } else if self.patient.is_some() {
            DiagnosticState::PatientSelected
        } else {
            DiagnosticState::Idle
        }
    }

    pub fn patient(&self) -> Option<&SelectedPatient> {
        self.patient.as_ref()
    }

    pub fn image(&self) -> Option<&ImageUpload> {
        self.image.as_ref()
    }

    pub fn stage1_passed(&self) -> bool {
        self.stage1_passed
    }

    pub fn stage1_result(&self) -> Option<&ValidationResult> {
        self.stage1_result.as_ref()
    }

    pub fn stage2_result(&self) -> Option<&DetectionResult> {
        self.stage2_result.as_ref()
    }

    pub fn stage3_result(&self) -> Option<&AnalysisResult> {
        self.stage3_result.as_ref()
    }

    pub fn in_progress(&self) -> bool {
        self.running.is_some()
    }

    pub fn running_stage(&self) -> Option<Stage> {
        self.running
    }

    /// Patient and image present, nothing running.
    pub fn can_validate(&self) -> bool {
        self.patient.is_some() && self.image.is_some() && !self.in_progress()
    }

    /// Detected disease from stage 2, if any.
    pub fn detected_disease(&self) -> Option<&str> {
        self.stage2_result.as_ref().and_then(|r| r.disease())
    }

    pub fn has_results(&self) -> bool {
        self.stage1_result.is_some() || self.stage2_result.is_some() || self.stage3_result.is_some()
    }

    pub(crate) fn clear_results(&mut self) {
        self.stage1_passed = false;
        self.stage1_result = None;
        self.stage2_result = None;
        self.stage3_result = None;
    }
}
