//! Analytics charts: bar (vitamins), pie (diseases) and line (monthly)
//! specs built from the backend's precomputed aggregates, plus a registry
//! that tears down the previous chart before installing a new one.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::client::Backend;
use crate::display::format_month;
use crate::models::Analytics;

/// Pie slice colors, cycled when there are more than six diseases.
pub const PIE_PALETTE: [&str; 6] = [
    "rgba(0, 198, 255, 0.8)",
    "rgba(46, 204, 113, 0.8)",
    "rgba(255, 184, 0, 0.8)",
    "rgba(255, 77, 79, 0.8)",
    "rgba(155, 89, 182, 0.8)",
    "rgba(52, 152, 219, 0.8)",
];

const BAR_COLOR: &str = "rgba(0, 198, 255, 0.7)";
const LINE_COLOR: &str = "rgba(0, 198, 255, 1)";

pub const EMPTY_TITLE: &str = "No Analytics Data";
pub const EMPTY_MESSAGE: &str = "Complete at least one diagnosis to view analytics.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSlot {
    Vitamins,
    Diseases,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub slot: ChartSlot,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub values: Vec<u32>,
    /// Legend for single-series charts.
    pub dataset_label: Option<String>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsView {
    Empty { title: String, message: String },
    Charts { charts: Vec<ChartSpec> },
}

impl AnalyticsView {
    pub fn empty() -> Self {
        Self::Empty {
            title: EMPTY_TITLE.to_string(),
            message: EMPTY_MESSAGE.to_string(),
        }
    }
}

/// Fetch aggregates for a patient. Any failure degrades to empty data.
pub async fn load<B: Backend>(backend: &B, patient_id: &str) -> Analytics {
    match backend.analytics(patient_id).await {
        Ok(analytics) => analytics,
        Err(e) => {
            tracing::warn!(patient_id, error = %e, "Failed to load analytics");
            Analytics::default()
        }
    }
}

/// Empty vitamins and diseases render the empty state, never blank charts.
pub fn analytics_view(analytics: &Analytics) -> AnalyticsView {
    if analytics.is_empty() {
        return AnalyticsView::empty();
    }
    AnalyticsView::Charts {
        charts: vec![
            vitamins_chart(&analytics.vitamins),
            diseases_chart(&analytics.diseases),
            monthly_chart(&analytics.monthly),
        ],
    }
}

fn split(counts: &[(String, u32)]) -> (Vec<String>, Vec<u32>) {
    counts.iter().map(|(k, v)| (k.clone(), *v)).unzip()
}

pub fn vitamins_chart(vitamins: &[(String, u32)]) -> ChartSpec {
    let (labels, values) = split(vitamins);
    ChartSpec {
        slot: ChartSlot::Vitamins,
        kind: ChartKind::Bar,
        labels,
        values,
        dataset_label: Some("Occurrences".into()),
        colors: vec![BAR_COLOR.into()],
    }
}

pub fn diseases_chart(diseases: &[(String, u32)]) -> ChartSpec {
    let (labels, values) = split(diseases);
    let colors = PIE_PALETTE
        .iter()
        .cycle()
        .take(labels.len())
        .map(|c| c.to_string())
        .collect();
    ChartSpec {
        slot: ChartSlot::Diseases,
        kind: ChartKind::Pie,
        labels,
        values,
        dataset_label: None,
        colors,
    }
}

pub fn monthly_chart(monthly: &[(String, u32)]) -> ChartSpec {
    ChartSpec {
        slot: ChartSlot::Monthly,
        kind: ChartKind::Line,
        labels: monthly.iter().map(|(m, _)| format_month(m)).collect(),
        values: monthly.iter().map(|(_, v)| *v).collect(),
        dataset_label: Some("Diagnoses".into()),
        colors: vec![LINE_COLOR.into()],
    }
}

// ═══════════════════════════════════════════════════════════
// ChartRegistry
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct ChartInstance {
    pub id: Uuid,
    pub spec: ChartSpec,
}

/// Live chart instances keyed by slot.
#[derive(Debug, Default)]
pub struct ChartRegistry {
    instances: HashMap<ChartSlot, ChartInstance>,
    destroyed: usize,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a chart, destroying whatever occupied its slot.
    pub fn install(&mut self, spec: ChartSpec) -> Uuid {
        let instance = ChartInstance {
            id: Uuid::new_v4(),
            spec,
        };
        let id = instance.id;
        if let Some(previous) = self.instances.insert(instance.spec.slot, instance) {
            self.destroyed += 1;
            tracing::debug!(slot = ?previous.spec.slot, id = %previous.id, "Chart destroyed");
        }
        id
    }

    /// Apply a view: install every chart, or clear all on the empty state.
    pub fn render(&mut self, view: &AnalyticsView) {
        match view {
            AnalyticsView::Empty { .. } => self.clear(),
            AnalyticsView::Charts { charts } => {
                for spec in charts {
                    self.install(spec.clone());
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.destroyed += self.instances.len();
        self.instances.clear();
    }

    pub fn get(&self, slot: ChartSlot) -> Option<&ChartInstance> {
        self.instances.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances torn down so far.
    pub fn destroyed(&self) -> usize {
        self.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockBackend, MockFailure};

    fn counts(pairs: &[(&str, u32)]) -> Vec<(String, u32)> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn sample() -> Analytics {
        Analytics {
            vitamins: counts(&[("Vitamin D", 4), ("Vitamin B12", 2)]),
            diseases: counts(&[("eczema", 3), ("psoriasis", 1)]),
            monthly: counts(&[("2024-01", 1), ("2024-02", 3)]),
        }
    }

    #[test]
    fn empty_aggregates_show_empty_state() {
        let view = analytics_view(&Analytics::default());
        assert_eq!(
            view,
            AnalyticsView::Empty {
                title: "No Analytics Data".into(),
                message: "Complete at least one diagnosis to view analytics.".into(),
            }
        );
    }

    #[test]
    fn monthly_alone_is_still_empty() {
        let analytics = Analytics {
            monthly: counts(&[("2024-01", 1)]),
            ..Default::default()
        };
        assert!(matches!(analytics_view(&analytics), AnalyticsView::Empty { .. }));
    }

    #[test]
    fn three_charts_in_order() {
        let AnalyticsView::Charts { charts } = analytics_view(&sample()) else {
            panic!("expected charts");
        };
        let kinds: Vec<ChartKind> = charts.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChartKind::Bar, ChartKind::Pie, ChartKind::Line]);
        assert_eq!(charts[0].labels, vec!["Vitamin D", "Vitamin B12"]);
        assert_eq!(charts[0].dataset_label.as_deref(), Some("Occurrences"));
        assert_eq!(charts[2].labels, vec!["Jan 2024", "Feb 2024"]);
        assert_eq!(charts[2].values, vec![1, 3]);
    }

    #[test]
    fn pie_palette_sliced_and_cycled() {
        let two = diseases_chart(&counts(&[("a", 1), ("b", 1)]));
        assert_eq!(two.colors, vec![PIE_PALETTE[0], PIE_PALETTE[1]]);

        let eight: Vec<(String, u32)> = (0..8).map(|i| (format!("d{i}"), 1)).collect();
        let chart = diseases_chart(&eight);
        assert_eq!(chart.colors.len(), 8);
        assert_eq!(chart.colors[6], PIE_PALETTE[0]);
    }

    #[test]
    fn reinstall_destroys_previous_instance() {
        let mut registry = ChartRegistry::new();
        let view = analytics_view(&sample());
        registry.render(&view);
        let first = registry.get(ChartSlot::Vitamins).unwrap().id;
        assert_eq!(registry.destroyed(), 0);

        registry.render(&view);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.destroyed(), 3);
        assert_ne!(registry.get(ChartSlot::Vitamins).unwrap().id, first);
    }

    #[test]
    fn empty_view_clears_registry() {
        let mut registry = ChartRegistry::new();
        registry.render(&analytics_view(&sample()));
        registry.render(&AnalyticsView::empty());
        assert!(registry.is_empty());
        assert_eq!(registry.destroyed(), 3);
    }

    #[tokio::test]
    async fn load_failure_degrades_to_empty() {
        let backend = MockBackend::new().failing_analytics(MockFailure::Server(500, "db locked".into()));
        let analytics = load(&backend, "PAVIT-00001").await;
        assert!(analytics.is_empty());
    }
}
