use serde::{Deserialize, Serialize};

use super::empty_as_none;
use crate::error::ClientError;

/// A patient record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// Editable patient fields, the body of create and update requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl PatientDraft {
    /// Trim every field and drop empty optional ones.
    pub fn normalized(self) -> Result<Self, ClientError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ClientError::Validation("Patient name is required".into()));
        }
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Ok(Self {
            name,
            phone: clean(self.phone),
            date_of_birth: clean(self.date_of_birth),
            address: clean(self.address),
        })
    }
}

impl From<&Patient> for PatientDraft {
    fn from(p: &Patient) -> Self {
        Self {
            name: p.name.clone(),
            phone: p.phone.clone(),
            date_of_birth: p.date_of_birth.clone(),
            address: p.address.clone(),
        }
    }
}

/// Update request: the draft plus the identifier it applies to.
#[derive(Debug, Clone, Serialize)]
pub struct PatientUpdate<'a> {
    pub patient_id: &'a str,
    #[serde(flatten)]
    pub draft: &'a PatientDraft,
}

/// Response to `POST /patients/create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPatient {
    #[serde(default)]
    pub status: String,
    pub patient_id: String,
}

/// Patient context held by a diagnostic session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedPatient {
    pub patient_id: String,
    pub name: Option<String>,
    pub diagnosis_date: Option<String>,
}

impl SelectedPatient {
    pub fn new(patient_id: &str) -> Result<Self, ClientError> {
        Ok(Self {
            patient_id: normalize_patient_id(patient_id)?,
            name: None,
            diagnosis_date: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_diagnosis_date(mut self, date: impl Into<String>) -> Self {
        self.diagnosis_date = Some(date.into());
        self
    }
}

impl From<&Patient> for SelectedPatient {
    fn from(p: &Patient) -> Self {
        Self {
            patient_id: p.id.trim().to_uppercase(),
            name: Some(p.name.clone()),
            diagnosis_date: None,
        }
    }
}

/// Trim and uppercase a patient identifier. Empty input is rejected.
pub fn normalize_patient_id(raw: &str) -> Result<String, ClientError> {
    let id = raw.trim().to_uppercase();
    if id.is_empty() {
        return Err(ClientError::Validation("Please enter a Patient ID".into()));
    }
    Ok(id)
}
