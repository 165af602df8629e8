//! Patient dashboard: ID-based login stub, latest report, diagnosis
//! history and analytics charts.
//!
//! The logged-in patient ID lives in a [`SessionStore`] under
//! [`SESSION_PATIENT_KEY`]. There is no authentication; knowing an ID is
//! enough.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analytics::{self, AnalyticsView, ChartRegistry};
use crate::client::Backend;
use crate::config::SESSION_PATIENT_KEY;
use crate::diagnostic::{recommendation_view, RecommendationView};
use crate::display::{format_date_time, format_short_date, format_time, percent_1dp};
use crate::error::ClientError;
use crate::models::{normalize_patient_id, Report, VitaminRecommendation};
use crate::notice::{NoticeCenter, NoticeKind};
use crate::patients::{patient_detail, PatientDetail};

// ═══════════════════════════════════════════════════════════
// Session storage
// ═══════════════════════════════════════════════════════════

/// Key-value storage for the dashboard session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&mut self, key: &str) -> Result<(), ClientError>;
}

/// Lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ClientError> {
        self.values.remove(key);
        Ok(())
    }
}

/// JSON object on disk, so a terminal login survives between invocations.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> HashMap<String, String> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session file");
            HashMap::new()
        })
    }

    fn write(&self, values: &HashMap<String, String>) -> Result<(), ClientError> {
        if values.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| ClientError::Validation(format!("Cannot encode session: {e}")))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read().remove(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = self.read();
        values.insert(key.to_string(), value.to_string());
        self.write(&values)
    }

    fn remove(&mut self, key: &str) -> Result<(), ClientError> {
        let mut values = self.read();
        if values.remove(key).is_some() {
            self.write(&values)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// View-models
// ═══════════════════════════════════════════════════════════

pub const NO_ASSOCIATIONS: &str = "No vitamin deficiency associations found for this condition.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeficiencyList {
    /// "Possible Vitamin Deficiencies (N)" when there are any.
    pub heading: Option<String>,
    pub items: Vec<RecommendationView>,
    pub empty_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LatestReportView {
    Empty {
        title: String,
        message: String,
    },
    Report {
        date: String,
        disease: String,
        /// Percentage with one decimal, also the bar width.
        confidence: String,
        deficiencies: DeficiencyList,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryItem {
    /// Counts down from the total, so the oldest diagnosis is 1.
    pub number: usize,
    pub date: String,
    pub time: String,
    pub disease: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub total_label: String,
    pub items: Vec<HistoryItem>,
    pub empty_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub patient_id: String,
    pub patient: Option<PatientDetail>,
    pub latest: LatestReportView,
    pub history: HistoryView,
    pub analytics: AnalyticsView,
}

pub fn deficiency_list(recommendations: &[VitaminRecommendation]) -> DeficiencyList {
    if recommendations.is_empty() {
        return DeficiencyList {
            heading: None,
            items: Vec::new(),
            empty_message: Some(NO_ASSOCIATIONS.to_string()),
        };
    }
    DeficiencyList {
        heading: Some(format!("Possible Vitamin Deficiencies ({})", recommendations.len())),
        items: recommendations
            .iter()
            .enumerate()
            .map(|(i, rec)| recommendation_view(i + 1, rec))
            .collect(),
        empty_message: None,
    }
}

/// Only the newest report (index 0) is shown in full.
pub fn latest_report_view(reports: &[Report]) -> LatestReportView {
    match reports.first() {
        None => LatestReportView::Empty {
            title: "No Reports Found".into(),
            message: "You don't have any medical reports yet.".into(),
        },
        Some(report) => LatestReportView::Report {
            date: format_date_time(&report.created_at),
            disease: report.detected_disease.clone(),
            confidence: percent_1dp(report.confidence_score),
            deficiencies: deficiency_list(&report.nutrition_recommendations),
        },
    }
}

pub fn history_view(reports: &[Report]) -> HistoryView {
    let total = reports.len();
    HistoryView {
        total_label: format!("Total Diagnoses: {total}"),
        items: reports
            .iter()
            .enumerate()
            .map(|(index, r)| HistoryItem {
                number: total - index,
                date: format_short_date(&r.created_at),
                time: format_time(&r.created_at),
                disease: r.detected_disease.clone(),
            })
            .collect(),
        empty_message: (total == 0).then(|| "No diagnosis history available.".to_string()),
    }
}

// ═══════════════════════════════════════════════════════════
// Dashboard
// ═══════════════════════════════════════════════════════════

pub struct Dashboard<B, S> {
    backend: B,
    store: S,
    patient_id: Option<String>,
    charts: ChartRegistry,
    notices: NoticeCenter,
}

impl<B: Backend, S: SessionStore> Dashboard<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            patient_id: None,
            charts: ChartRegistry::new(),
            notices: NoticeCenter::new(),
        }
    }

    pub fn patient_id(&self) -> Option<&str> {
        self.patient_id.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.patient_id.is_some()
    }

    pub fn notices(&mut self) -> &mut NoticeCenter {
        &mut self.notices
    }

    pub fn charts(&self) -> &ChartRegistry {
        &self.charts
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Verify the ID exists and remember it for the session.
    pub async fn login(&mut self, raw_id: &str) -> Result<String, ClientError> {
        let id = match normalize_patient_id(raw_id) {
            Ok(id) => id,
            Err(e) => {
                self.notices.push(NoticeKind::Error, "Please enter your Patient ID");
                return Err(e);
            }
        };

        if let Err(e) = self.backend.get_patient(&id).await {
            tracing::info!(patient_id = %id, kind = ?e.kind(), "Login rejected");
            let message = match e {
                ClientError::Network(_) => "Connection error. Please try again.",
                _ => "Patient ID not found. Please check and try again.",
            };
            self.notices.push(NoticeKind::Error, message);
            return Err(e);
        }

        self.store.set(SESSION_PATIENT_KEY, &id)?;
        tracing::info!(patient_id = %id, "Patient logged in");
        self.patient_id = Some(id.clone());
        self.notices.push(NoticeKind::Success, "Login successful!");
        Ok(id)
    }

    /// Resume a stored session without re-verifying the ID.
    pub fn restore(&mut self) -> Option<String> {
        let id = self.store.get(SESSION_PATIENT_KEY)?;
        tracing::debug!(patient_id = %id, "Session restored");
        self.patient_id = Some(id.clone());
        Some(id)
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.store.remove(SESSION_PATIENT_KEY)?;
        if let Some(id) = self.patient_id.take() {
            tracing::info!(patient_id = %id, "Patient logged out");
        }
        self.charts.clear();
        self.notices.push(NoticeKind::Info, "Logged out successfully");
        Ok(())
    }

    /// Fetch patient info, reports and analytics, one after another.
    pub async fn load(&mut self) -> Result<DashboardView, ClientError> {
        let Some(id) = self.patient_id.clone() else {
            return Err(ClientError::Validation("Not logged in".into()));
        };

        let patient = match self.backend.get_patient(&id).await {
            Ok(p) => Some(patient_detail(&p)),
            Err(e) => {
                tracing::warn!(patient_id = %id, error = %e, "Failed to load patient info");
                None
            }
        };

        let reports = match self.backend.reports(&id).await {
            Ok(reports) => reports,
            Err(e) => {
                tracing::warn!(patient_id = %id, error = %e, "Failed to load reports");
                self.notices.push(NoticeKind::Error, "Failed to load reports");
                Vec::new()
            }
        };

        let data = analytics::load(&self.backend, &id).await;
        let analytics = analytics::analytics_view(&data);
        self.charts.render(&analytics);

        Ok(DashboardView {
            patient_id: id,
            patient,
            latest: latest_report_view(&reports),
            history: history_view(&reports),
            analytics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockBackend, MockFailure};
    use crate::models::Analytics;

    fn report(created_at: &str, disease: &str, recs: Vec<VitaminRecommendation>) -> Report {
        Report {
            id: None,
            patient_id: Some("PAVIT-00001".into()),
            created_at: created_at.into(),
            detected_disease: disease.into(),
            confidence_score: 0.912,
            nutrition_recommendations: recs,
        }
    }

    fn b12() -> VitaminRecommendation {
        VitaminRecommendation {
            vitamin: "Vitamin B12".into(),
            association_strength: 0.8,
            confidence_note: "Moderate evidence".into(),
            foods: vec!["eggs".into()],
            notes: String::new(),
            source_type: "clinical_study".into(),
        }
    }

    fn dashboard(backend: MockBackend) -> Dashboard<MockBackend, MemorySessionStore> {
        Dashboard::new(backend, MemorySessionStore::new())
    }

    #[tokio::test]
    async fn login_stores_normalized_id() {
        let mut d = dashboard(MockBackend::new().with_patient("PAVIT-00001", "Asha Rao"));
        let id = d.login("  pavit-00001 ").await.unwrap();
        assert_eq!(id, "PAVIT-00001");
        assert_eq!(d.store().get(SESSION_PATIENT_KEY).as_deref(), Some("PAVIT-00001"));
        assert_eq!(d.notices().last().unwrap().message, "Login successful!");
    }

    #[tokio::test]
    async fn login_unknown_id() {
        let mut d = dashboard(MockBackend::new());
        assert!(d.login("PAVIT-99999").await.is_err());
        assert!(!d.is_logged_in());
        assert_eq!(
            d.notices().last().unwrap().message,
            "Patient ID not found. Please check and try again."
        );
    }

    #[tokio::test]
    async fn login_blank_id() {
        let mut d = dashboard(MockBackend::new());
        assert!(d.login("  ").await.is_err());
        assert_eq!(d.notices().last().unwrap().message, "Please enter your Patient ID");
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let mut d = dashboard(MockBackend::new().with_patient("PAVIT-00001", "Asha Rao"));
        d.login("PAVIT-00001").await.unwrap();
        d.logout().unwrap();
        assert!(d.store().get(SESSION_PATIENT_KEY).is_none());
        assert!(d.restore().is_none());
        assert_eq!(d.notices().last().unwrap().message, "Logged out successfully");
    }

    #[tokio::test]
    async fn load_builds_full_view() {
        let backend = MockBackend::new()
            .with_patient("PAVIT-00001", "Asha Rao")
            .with_reports(vec![
                report("2024-02-10 14:30:00", "psoriasis", vec![b12()]),
                report("2024-01-05 09:00:00", "eczema", vec![]),
            ])
            .with_analytics(Analytics {
                vitamins: vec![("Vitamin B12".into(), 1)],
                diseases: vec![("psoriasis".into(), 1), ("eczema".into(), 1)],
                monthly: vec![("2024-01".into(), 1), ("2024-02".into(), 1)],
            });
        let mut d = dashboard(backend);
        d.login("PAVIT-00001").await.unwrap();

        let view = d.load().await.unwrap();
        assert_eq!(view.patient.as_ref().unwrap().phone, "N/A");

        let LatestReportView::Report { disease, confidence, deficiencies, .. } = &view.latest else {
            panic!("expected a report");
        };
        assert_eq!(disease, "psoriasis");
        assert_eq!(confidence, "91.2");
        assert_eq!(deficiencies.heading.as_deref(), Some("Possible Vitamin Deficiencies (1)"));
        assert_eq!(deficiencies.items[0].association_label, "80% Association");

        assert_eq!(view.history.total_label, "Total Diagnoses: 2");
        assert_eq!(view.history.items[0].number, 2);
        assert_eq!(view.history.items[0].date, "Feb 10, 2024");
        assert_eq!(view.history.items[0].time, "14:30");
        assert_eq!(view.history.items[1].number, 1);

        assert!(matches!(view.analytics, AnalyticsView::Charts { .. }));
        assert_eq!(d.charts().len(), 3);

        d.load().await.unwrap();
        assert_eq!(d.charts().destroyed(), 3);
    }

    #[tokio::test]
    async fn load_without_reports_or_analytics() {
        let backend = MockBackend::new()
            .with_patient("PAVIT-00002", "Ravi")
            .failing_analytics(MockFailure::Network);
        let mut d = dashboard(backend);
        d.login("PAVIT-00002").await.unwrap();

        let view = d.load().await.unwrap();
        assert!(matches!(view.latest, LatestReportView::Empty { .. }));
        assert_eq!(
            view.history.empty_message.as_deref(),
            Some("No diagnosis history available.")
        );
        assert_eq!(view.analytics, AnalyticsView::empty());
    }

    #[tokio::test]
    async fn load_requires_login() {
        let mut d = dashboard(MockBackend::new());
        assert!(d.load().await.is_err());
    }

    #[test]
    fn empty_recommendations_block() {
        let list = deficiency_list(&[]);
        assert!(list.heading.is_none());
        assert_eq!(list.empty_message.as_deref(), Some(NO_ASSOCIATIONS));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut store = FileSessionStore::new(&path);
        store.set(SESSION_PATIENT_KEY, "PAVIT-00001").unwrap();

        let reopened = FileSessionStore::new(&path);
        assert_eq!(reopened.get(SESSION_PATIENT_KEY).as_deref(), Some("PAVIT-00001"));

        let mut reopened = reopened;
        reopened.remove(SESSION_PATIENT_KEY).unwrap();
        assert!(!path.exists());
        assert!(store.get(SESSION_PATIENT_KEY).is_none());
    }

    #[test]
    fn file_store_tolerates_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileSessionStore::new(&path);
        assert!(store.get(SESSION_PATIENT_KEY).is_none());
    }

    #[tokio::test]
    async fn restore_skips_verification() {
        let mut store = MemorySessionStore::new();
        store.set(SESSION_PATIENT_KEY, "PAVIT-00042").unwrap();
        let mut d = Dashboard::new(MockBackend::new(), store);
        assert_eq!(d.restore().as_deref(), Some("PAVIT-00042"));
        assert!(d.is_logged_in());
    }
}
