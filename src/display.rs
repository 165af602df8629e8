//! Timestamp and label formatting shared by the view builders.

use chrono::{NaiveDate, NaiveDateTime};

/// Fallback for absent optional fields.
pub const NOT_AVAILABLE: &str = "N/A";

pub fn or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

/// Parse a backend timestamp: `YYYY-MM-DD HH:MM:SS` (SQLite default),
/// the ISO `T` form, optionally with fractional seconds, or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// "3/2/2024, 10:15:00 AM". Unparseable input is returned unchanged.
pub fn format_date_time(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        None => raw.to_string(),
    }
}

/// "Jan 5, 2024".
pub fn format_short_date(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts.format("%b %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}

/// "14:30".
pub fn format_time(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts.format("%H:%M").to_string(),
        None => String::new(),
    }
}

/// "2024-01" becomes "Jan 2024".
pub fn format_month(key: &str) -> String {
    NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d")
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|_| key.to_string())
}

/// Probability as a percentage with one decimal: 0.873 becomes "87.3".
pub fn percent_1dp(probability: f64) -> String {
    format!("{:.1}", probability * 100.0)
}
