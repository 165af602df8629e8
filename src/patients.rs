//! Patient management: CRUD against the backend plus the table, picker,
//! detail and form view-models.

use serde::Serialize;

use crate::client::Backend;
use crate::display::{format_date_time, or_na};
use crate::error::ClientError;
use crate::models::{normalize_patient_id, Patient, PatientDraft};
use crate::notice::{NoticeCenter, NoticeKind};

pub const EMPTY_TABLE_MESSAGE: &str = "No patients found. Click \"Add New Patient\" to get started.";
pub const PICKER_PLACEHOLDER: &str = "-- Select a patient --";

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub fn delete_prompt(patient_id: &str) -> String {
    format!("Are you sure you want to delete patient {patient_id}?")
}

// ═══════════════════════════════════════════════════════════
// PatientDirectory
// ═══════════════════════════════════════════════════════════

/// Patient CRUD with notices for every outcome. Last write wins.
pub struct PatientDirectory<B> {
    backend: B,
    notices: NoticeCenter,
}

impl<B: Backend> PatientDirectory<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            notices: NoticeCenter::new(),
        }
    }

    pub fn notices(&mut self) -> &mut NoticeCenter {
        &mut self.notices
    }

    /// All patients. A failure is surfaced and yields an empty list.
    pub async fn list(&mut self) -> Vec<Patient> {
        match self.backend.list_patients().await {
            Ok(patients) => {
                tracing::debug!(count = patients.len(), "Patients loaded");
                patients
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load patients");
                self.notices.push(NoticeKind::Error, "Failed to load patients");
                Vec::new()
            }
        }
    }

    pub async fn get(&mut self, raw_id: &str) -> Result<Patient, ClientError> {
        let outcome = match normalize_patient_id(raw_id) {
            Ok(id) => self.backend.get_patient(&id).await,
            Err(e) => Err(e),
        };
        self.surface(outcome)
    }

    /// Create a patient and return the identifier the backend assigned.
    pub async fn create(&mut self, draft: PatientDraft) -> Result<String, ClientError> {
        let outcome = match draft.normalized() {
            Ok(draft) => self.backend.create_patient(&draft).await,
            Err(e) => Err(e),
        };
        let id = self.surface(outcome)?;
        self.notices.push(NoticeKind::Success, "Patient created successfully");
        Ok(id)
    }

    pub async fn update(&mut self, raw_id: &str, draft: PatientDraft) -> Result<(), ClientError> {
        let outcome = match (normalize_patient_id(raw_id), draft.normalized()) {
            (Ok(id), Ok(draft)) => self.backend.update_patient(&id, &draft).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        self.surface(outcome)?;
        self.notices.push(NoticeKind::Success, "Patient updated successfully");
        Ok(())
    }

    /// Delete after confirmation. Returns `false` when the user declined.
    pub async fn delete(&mut self, raw_id: &str, confirm: &impl Confirm) -> Result<bool, ClientError> {
        let id = self.surface(normalize_patient_id(raw_id))?;
        if !confirm.confirm(&delete_prompt(&id)) {
            tracing::debug!(patient_id = %id, "Delete declined");
            return Ok(false);
        }

        let outcome = self.backend.delete_patient(&id).await;
        self.surface(outcome)?;
        self.notices.push(NoticeKind::Success, "Patient deleted successfully");
        Ok(true)
    }

    fn surface<T>(&mut self, outcome: Result<T, ClientError>) -> Result<T, ClientError> {
        outcome.map_err(|e| {
            self.notices.push_error(&e);
            e
        })
    }
}

// ═══════════════════════════════════════════════════════════
// View-models
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub date_of_birth: String,
    pub address: String,
    pub created_at: String,
}

impl From<&Patient> for PatientRow {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            phone: or_na(p.phone.as_deref()),
            date_of_birth: or_na(p.date_of_birth.as_deref()),
            address: or_na(p.address.as_deref()),
            created_at: format_date_time(&p.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientTable {
    pub rows: Vec<PatientRow>,
    /// Set when there are no rows.
    pub empty_message: Option<String>,
}

pub fn patient_table(patients: &[Patient]) -> PatientTable {
    PatientTable {
        rows: patients.iter().map(PatientRow::from).collect(),
        empty_message: patients.is_empty().then(|| EMPTY_TABLE_MESSAGE.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerOption {
    pub value: String,
    pub label: String,
}

/// Options for the patient picker, `"{id} - {name}"`.
pub fn picker_options(patients: &[Patient]) -> Vec<PickerOption> {
    patients
        .iter()
        .map(|p| PickerOption {
            value: p.id.clone(),
            label: format!("{} - {}", p.id, p.name),
        })
        .collect()
}

/// Detail panel shown under the picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientDetail {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub date_of_birth: String,
    pub address: String,
}

pub fn patient_detail(patient: &Patient) -> PatientDetail {
    PatientDetail {
        id: patient.id.clone(),
        name: patient.name.clone(),
        phone: or_na(patient.phone.as_deref()),
        date_of_birth: or_na(patient.date_of_birth.as_deref()),
        address: or_na(patient.address.as_deref()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "patient_id", rename_all = "snake_case")]
pub enum FormMode {
    Add,
    Edit(String),
}

/// Add/edit modal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientForm {
    pub mode: FormMode,
    pub draft: PatientDraft,
}

impl PatientForm {
    pub fn add() -> Self {
        Self {
            mode: FormMode::Add,
            draft: PatientDraft::default(),
        }
    }

    pub fn edit(patient: &Patient) -> Self {
        Self {
            mode: FormMode::Edit(patient.id.clone()),
            draft: PatientDraft::from(patient),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Add => "Add New Patient",
            FormMode::Edit(_) => "Edit Patient",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Add => "Save Patient",
            FormMode::Edit(_) => "Update Patient",
        }
    }

    /// Create or update depending on the mode. Returns the patient's ID.
    pub async fn submit<B: Backend>(self, directory: &mut PatientDirectory<B>) -> Result<String, ClientError> {
        match self.mode {
            FormMode::Add => directory.create(self.draft).await,
            FormMode::Edit(id) => {
                directory.update(&id, self.draft).await?;
                Ok(id)
            }
        }
    }
}
