pub mod patient;
pub mod report;
pub mod stages;

pub use patient::*;
pub use report::*;
pub use stages::*;

use serde::{Deserialize, Deserializer};

/// Deserialize an optional string, treating `""` and whitespace as absent.
///
/// The backend sends `""` for missing fields in list responses and `null`
/// in single-record responses.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
