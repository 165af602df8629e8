use serde::{Deserialize, Serialize};

use super::empty_as_none;
use super::report::VitaminRecommendation;

/// Stage 1 response from the AI service `/validate` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub message: Option<String>,
}

/// Stage 2 response from the AI service `/detect` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub disease: Option<String>,
    /// Probability in 0–1.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub success: Option<bool>,
}

impl DetectionResult {
    pub fn disease(&self) -> Option<&str> {
        self.disease.as_deref()
    }
}

/// Stage 3 response from the backend `/analyze_stage3` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub report_id: Option<i64>,
    #[serde(default)]
    pub detected_disease: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub nutrition_recommendations: Vec<VitaminRecommendation>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// `/health` payload from either service. Only reachability matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}
