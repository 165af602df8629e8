use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// One vitamin deficiency associated with a detected condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitaminRecommendation {
    pub vitamin: String,
    /// Backend-supplied confidence (0–1) that the condition correlates with
    /// this deficiency.
    pub association_strength: f64,
    #[serde(default)]
    pub confidence_note: String,
    #[serde(default)]
    pub foods: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub source_type: String,
}

/// A stored diagnostic report. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub patient_id: Option<String>,
    pub created_at: String,
    pub detected_disease: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub nutrition_recommendations: Vec<VitaminRecommendation>,
}

/// Precomputed per-patient aggregates for the analytics charts.
///
/// Each map keeps the key order the backend sent: vitamins by descending
/// count, monthly by ascending `YYYY-MM`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    #[serde(default, deserialize_with = "ordered_counts")]
    pub vitamins: Vec<(String, u32)>,
    #[serde(default, deserialize_with = "ordered_counts")]
    pub diseases: Vec<(String, u32)>,
    #[serde(default, deserialize_with = "ordered_counts")]
    pub monthly: Vec<(String, u32)>,
}

impl Analytics {
    /// No diagnoses recorded yet.
    pub fn is_empty(&self) -> bool {
        self.vitamins.is_empty() && self.diseases.is_empty()
    }
}

/// Read a JSON object of counts into a `Vec`, preserving key order.
fn ordered_counts<'de, D>(deserializer: D) -> Result<Vec<(String, u32)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CountsVisitor;

    impl<'de> Visitor<'de> for CountsVisitor {
        type Value = Vec<(String, u32)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of label to count")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, u32>()? {
                out.push((key, value));
            }
            Ok(out)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(CountsVisitor)
}
