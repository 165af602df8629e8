//! Pure rendering of a diagnostic session into a view-model.
//!
//! Nothing here performs I/O; the terminal front end and the tests both
//! consume the same [`DiagnosticView`].

use serde::Serialize;

use crate::display::percent_1dp;
use crate::models::{
    AnalysisResult, DetectionResult, SelectedPatient, ValidationResult, VitaminRecommendation,
};
use crate::upload::ImageUpload;

use super::session::{DiagnosticSession, DiagnosticState, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Error,
    Warning,
    Accent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ButtonView {
    pub enabled: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfoView {
    pub filename: String,
    /// Megabytes with two decimals, e.g. `"5.00 MB"`.
    pub size: String,
    pub status: String,
}

/// Button on a result card that runs the next stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardAction {
    pub label: String,
    pub stage: Stage,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSection {
    pub heading: String,
    pub text: String,
}

/// Confidence bar: width in percent plus its caption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meter {
    pub width_percent: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationView {
    pub number: usize,
    pub vitamin: String,
    pub association_label: String,
    pub tone: Tone,
    pub medical_note: String,
    pub foods: String,
    pub notes: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub title: String,
    pub tone: Tone,
    pub lines: Vec<String>,
    pub sections: Vec<CardSection>,
    pub meter: Option<Meter>,
    pub recommendations: Vec<RecommendationView>,
    pub action: Option<CardAction>,
    pub footer: Option<String>,
}

impl ResultCard {
    fn new(title: &str, tone: Tone) -> Self {
        Self {
            title: title.to_string(),
            tone,
            lines: Vec::new(),
            sections: Vec::new(),
            meter: None,
            recommendations: Vec::new(),
            action: None,
            footer: None,
        }
    }

    fn section(mut self, heading: &str, text: impl Into<String>) -> Self {
        self.sections.push(CardSection {
            heading: heading.to_string(),
            text: text.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticView {
    pub state: DiagnosticState,
    pub patient: Option<SelectedPatient>,
    pub analyze_button: ButtonView,
    pub image_info: Option<ImageInfoView>,
    pub cards: Vec<ResultCard>,
    pub results_visible: bool,
}

pub fn render(session: &DiagnosticSession) -> DiagnosticView {
    let busy = session.in_progress();
    let mut cards = Vec::new();

    if let Some(result) = session.stage1_result() {
        cards.push(if session.stage1_passed() {
            stage1_passed_card(result, busy)
        } else {
            stage1_failed_card(result, busy)
        });
    }
    if let Some(result) = session.stage2_result() {
        cards.push(stage2_card(result, busy));
    }
    if let Some(result) = session.stage3_result() {
        cards.push(stage3_card(result));
    }

    DiagnosticView {
        state: session.state(),
        patient: session.patient().cloned(),
        analyze_button: analyze_button(session),
        image_info: session.image().map(image_info),
        results_visible: !cards.is_empty(),
        cards,
    }
}

pub fn analyze_button(session: &DiagnosticSession) -> ButtonView {
    let enabled = session.can_validate();
    let label = if enabled {
        "Validate Image (Stage 1)"
    } else if session.in_progress() {
        "Validating..."
    } else {
        "Complete Patient Info & Upload Image"
    };
    ButtonView {
        enabled,
        label: label.to_string(),
    }
}

pub fn image_info(image: &ImageUpload) -> ImageInfoView {
    ImageInfoView {
        filename: image.filename.clone(),
        size: format!("{:.2} MB", image.size_bytes() as f64 / 1024.0 / 1024.0),
        status: "Ready for Validation".to_string(),
    }
}

fn stage1_passed_card(result: &ValidationResult, busy: bool) -> ResultCard {
    let mut card = ResultCard::new("Stage 1: Image Validation - PASSED", Tone::Success)
        .section("Image Caption", quoted_caption(result))
        .section(
            "Validation Reason",
            result.reason.as_deref().unwrap_or("Biological content detected"),
        );
    card.lines.push("Medical image verified successfully".into());
    card.action = Some(CardAction {
        label: "Proceed to Stage 2 - Disease Detection".into(),
        stage: Stage::Detection,
        enabled: !busy,
    });
    card
}

fn stage1_failed_card(result: &ValidationResult, busy: bool) -> ResultCard {
    let mut card = ResultCard::new("Stage 1: Image Validation - FAILED", Tone::Error)
        .section("Image Caption", quoted_caption(result))
        .section(
            "Rejection Reason",
            result
                .reason
                .as_deref()
                .unwrap_or("Image does not contain biological/medical content"),
        );
    if let Some(message) = &result.message {
        card.lines.push(message.clone());
    }
    card.action = Some(CardAction {
        label: "Admin Override - Proceed to Stage 2".into(),
        stage: Stage::Detection,
        enabled: !busy,
    });
    card.footer = Some(
        "Recommended: Upload a clear medical image of a human body part, \
         or use admin override to proceed anyway."
            .into(),
    );
    card
}

fn quoted_caption(result: &ValidationResult) -> String {
    format!("\"{}\"", result.caption.as_deref().unwrap_or("N/A"))
}

fn stage2_card(result: &DetectionResult, busy: bool) -> ResultCard {
    let percent = result.confidence * 100.0;
    let mut card = ResultCard::new("Stage 2: Disease Detection - COMPLETED", Tone::Success)
        .section("Detected Disease", result.disease().unwrap_or_default());
    card.meter = Some(Meter {
        width_percent: percent,
        label: format!("Confidence: {}%", percent_1dp(result.confidence)),
    });
    card.action = Some(CardAction {
        label: "Continue to Stage 3 - Vitamin Analysis".into(),
        stage: Stage::Analysis,
        enabled: !busy,
    });
    card
}

fn stage3_card(result: &AnalysisResult) -> ResultCard {
    let recs = &result.nutrition_recommendations;
    if recs.is_empty() {
        let mut card = ResultCard::new("Stage 3: Vitamin Analysis - NO DATA", Tone::Warning);
        card.lines
            .push("No vitamin deficiency associations found for this condition.".into());
        return card;
    }

    let mut card = ResultCard::new("Stage 3: Vitamin Analysis - COMPLETED", Tone::Accent);
    card.lines.push(deficiency_count_line(recs.len()));
    card.recommendations = recs
        .iter()
        .enumerate()
        .map(|(i, rec)| recommendation_view(i + 1, rec))
        .collect();
    card
}

/// "Detected 1 possible vitamin deficiency" / "... deficiencies".
pub fn deficiency_count_line(count: usize) -> String {
    let noun = if count == 1 { "deficiency" } else { "deficiencies" };
    format!("Detected {count} possible vitamin {noun}")
}

pub fn recommendation_view(number: usize, rec: &VitaminRecommendation) -> RecommendationView {
    RecommendationView {
        number,
        vitamin: rec.vitamin.clone(),
        association_label: association_label(rec.association_strength),
        tone: strength_tone(rec.association_strength),
        medical_note: rec.confidence_note.clone(),
        foods: rec.foods.join(", "),
        notes: rec.notes.clone(),
        source: rec.source_type.replacen('_', " ", 1),
    }
}

pub fn association_label(strength: f64) -> String {
    format!("{:.0}% Association", strength * 100.0)
}

/// Strong associations (≥ 0.8) render as errors, moderate (≥ 0.6) as warnings.
pub fn strength_tone(strength: f64) -> Tone {
    if strength >= 0.8 {
        Tone::Error
    } else if strength >= 0.6 {
        Tone::Warning
    } else {
        Tone::Accent
    }
}
