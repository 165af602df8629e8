//! Terminal front end. Each subcommand drives one library operation and
//! prints the resulting view-model, as text or as JSON with `--json`.

use std::fmt::Write as _;
use std::io::BufRead;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::client::{AiService, AiServiceClient, Backend, BackendClient};
use crate::config::{self, ServiceConfig, HEALTH_CHECK_INTERVAL};
use crate::dashboard::{Dashboard, DashboardView, DeficiencyList, FileSessionStore, LatestReportView};
use crate::diagnostic::{render, DiagnosticOrchestrator, DiagnosticView, RecommendationView};
use crate::error::ClientError;
use crate::health::{check_system_status, HealthMonitor, HealthSnapshot};
use crate::models::{normalize_patient_id, PatientDraft, SelectedPatient};
use crate::notice::{NoticeCenter, NoticeKind};
use crate::patients::{patient_detail, patient_table, PatientDetail, PatientDirectory, PatientForm, PatientTable};
use crate::analytics::AnalyticsView;
use crate::upload::ImageUpload;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Parser)]
#[command(name = "vitalens")]
#[command(about = "Staged medical image diagnostics: validation, detection, vitamin analysis")]
#[command(version)]
pub struct Cli {
    /// Print view-models as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check both services
    Status {
        /// Keep checking until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Manage patients
    #[command(subcommand)]
    Patients(PatientCommand),
    /// Run the diagnostic pipeline on an image
    Diagnose {
        /// Patient ID (PAVIT-XXXXX)
        #[arg(long)]
        patient: String,
        /// Image file to analyze
        #[arg(long)]
        image: PathBuf,
        /// Diagnosis date shown with the patient
        #[arg(long)]
        date: Option<String>,
        /// Continue to detection even if validation rejects the image
        #[arg(long = "override")]
        force: bool,
        /// Stop after disease detection
        #[arg(long)]
        skip_analysis: bool,
    },
    /// Log in to the patient dashboard
    Login {
        /// Patient ID (PAVIT-XXXXX)
        patient_id: String,
    },
    /// Forget the logged-in patient
    Logout,
    /// Show the logged-in patient's reports and analytics
    Dashboard,
}

#[derive(Debug, Subcommand)]
pub enum PatientCommand {
    /// List all patients
    List,
    /// Show one patient
    Show { patient_id: String },
    /// Register a patient
    Add {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        details: PatientDetails,
    },
    /// Update a patient; omitted fields keep their value
    Edit {
        patient_id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        details: PatientDetails,
    },
    /// Delete a patient
    Delete {
        patient_id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Default, clap::Args)]
pub struct PatientDetails {
    #[arg(long)]
    pub phone: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    pub dob: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

impl PatientDetails {
    fn apply(self, draft: &mut PatientDraft) {
        if self.phone.is_some() {
            draft.phone = self.phone;
        }
        if self.dob.is_some() {
            draft.date_of_birth = self.dob;
        }
        if self.address.is_some() {
            draft.address = self.address;
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Output
// ═══════════════════════════════════════════════════════════

/// Writes view-models to stdout and notices to stderr.
pub struct Output {
    json: bool,
    notices_shown: usize,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            notices_shown: 0,
        }
    }

    /// Whether any notice reached the user.
    pub fn surfaced(&self) -> bool {
        self.notices_shown > 0
    }

    pub fn notices(&mut self, center: &mut NoticeCenter) {
        for notice in center.drain() {
            eprintln!("{} {}", notice_marker(notice.kind), notice.message);
            self.notices_shown += 1;
        }
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", text(value));
        }
        Ok(())
    }
}

fn notice_marker(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Success => "[ok]",
        NoticeKind::Error => "[error]",
        NoticeKind::Warning => "[warn]",
        NoticeKind::Info => "[info]",
    }
}

// ═══════════════════════════════════════════════════════════
// Dispatch
// ═══════════════════════════════════════════════════════════

pub async fn execute(cli: Cli, config: &ServiceConfig, out: &mut Output) -> Result<(), CliError> {
    let ai = AiServiceClient::new(config)?;
    let backend = BackendClient::new(config)?;
    tracing::debug!(api_url = %config.api_url, ai_url = %config.ai_url, "Clients ready");

    match cli.command {
        Commands::Status { watch: false } => {
            let snapshot = check_system_status(&ai, &backend).await;
            out.emit(&snapshot, status_text)
        }
        Commands::Status { watch: true } => watch_status(ai, backend, out).await,
        Commands::Patients(command) => {
            let mut directory = PatientDirectory::new(backend);
            let result = patients(command, &mut directory, out).await;
            out.notices(directory.notices());
            result
        }
        Commands::Diagnose {
            patient,
            image,
            date,
            force,
            skip_analysis,
        } => {
            let mut orchestrator = DiagnosticOrchestrator::new(ai, backend);
            let plan = DiagnosePlan {
                patient_id: patient,
                diagnosis_date: date,
                force,
                skip_analysis,
            };
            let result = match ImageUpload::from_path(&image) {
                Ok(upload) => diagnose(&mut orchestrator, plan, upload).await,
                Err(e) => {
                    orchestrator.notices().push_error(&e);
                    Err(e)
                }
            };
            out.notices(orchestrator.notices());
            out.emit(&result?, diagnostic_text)
        }
        Commands::Login { patient_id } => {
            let mut dashboard = Dashboard::new(backend, FileSessionStore::new(config::session_file()));
            let result = dashboard.login(&patient_id).await;
            out.notices(dashboard.notices());
            let id = result?;
            out.emit(&id, |id| format!("Logged in as {id}\n"))
        }
        Commands::Logout => {
            let mut dashboard = Dashboard::new(backend, FileSessionStore::new(config::session_file()));
            let result = dashboard.logout();
            out.notices(dashboard.notices());
            Ok(result?)
        }
        Commands::Dashboard => {
            let mut dashboard = Dashboard::new(backend, FileSessionStore::new(config::session_file()));
            if dashboard.restore().is_none() {
                dashboard
                    .notices()
                    .push(NoticeKind::Warning, "Not logged in. Run `vitalens login <PATIENT_ID>` first.");
                out.notices(dashboard.notices());
                return Err(ClientError::Validation("Not logged in".into()).into());
            }
            let result = dashboard.load().await;
            out.notices(dashboard.notices());
            out.emit(&result?, dashboard_text)
        }
    }
}

async fn watch_status(ai: AiServiceClient, backend: BackendClient, out: &mut Output) -> Result<(), CliError> {
    let monitor = HealthMonitor::spawn(ai, backend, HEALTH_CHECK_INTERVAL);
    let mut rx = monitor.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                out.emit(&snapshot, status_text)?;
            }
        }
    }

    monitor.shutdown().await;
    Ok(())
}

async fn patients<B: Backend>(
    command: PatientCommand,
    directory: &mut PatientDirectory<B>,
    out: &mut Output,
) -> Result<(), CliError> {
    match command {
        PatientCommand::List => {
            let patients = directory.list().await;
            out.emit(&patient_table(&patients), table_text)
        }
        PatientCommand::Show { patient_id } => {
            let patient = directory.get(&patient_id).await?;
            out.emit(&patient_detail(&patient), detail_text)
        }
        PatientCommand::Add { name, details } => {
            let mut form = PatientForm::add();
            form.draft.name = name;
            details.apply(&mut form.draft);
            let id = form.submit(directory).await?;
            out.emit(&id, |id| format!("Created {id}\n"))
        }
        PatientCommand::Edit {
            patient_id,
            name,
            details,
        } => {
            let existing = directory.get(&patient_id).await?;
            let mut form = PatientForm::edit(&existing);
            if let Some(name) = name {
                form.draft.name = name;
            }
            details.apply(&mut form.draft);
            let id = form.submit(directory).await?;
            out.emit(&id, |id| format!("Updated {id}\n"))
        }
        PatientCommand::Delete { patient_id, yes } => {
            let deleted = if yes {
                directory.delete(&patient_id, &|_: &str| true).await?
            } else {
                directory.delete(&patient_id, &prompt_stdin).await?
            };
            out.emit(&deleted, |deleted| {
                if *deleted {
                    String::new()
                } else {
                    "Cancelled\n".to_string()
                }
            })
        }
    }
}

fn prompt_stdin(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// What a `diagnose` run should do once the image is attached.
#[derive(Debug, Clone)]
pub struct DiagnosePlan {
    pub patient_id: String,
    pub diagnosis_date: Option<String>,
    /// Run detection even when validation rejects the image.
    pub force: bool,
    pub skip_analysis: bool,
}

/// Select the patient, attach the image and run the stages in order.
///
/// Stops after stage 1 on a rejected image unless `force` is set. Returns the
/// rendered session either way.
pub async fn diagnose<A: AiService, B: Backend>(
    orchestrator: &mut DiagnosticOrchestrator<A, B>,
    plan: DiagnosePlan,
    image: ImageUpload,
) -> Result<DiagnosticView, ClientError> {
    let id = match normalize_patient_id(&plan.patient_id) {
        Ok(id) => id,
        Err(e) => {
            orchestrator.notices().push_error(&e);
            return Err(e);
        }
    };

    let lookup = orchestrator.backend().get_patient(&id).await;
    let mut selected = match lookup {
        Ok(patient) => SelectedPatient::from(&patient),
        Err(e) if e.is_not_found() => {
            orchestrator.notices().push_error(&e);
            return Err(e);
        }
        Err(e) => {
            tracing::warn!(patient_id = %id, error = %e, "Patient lookup failed, continuing with ID only");
            SelectedPatient::new(&id)?
        }
    };
    if let Some(date) = plan.diagnosis_date {
        selected = selected.with_diagnosis_date(date);
    }

    orchestrator.select_patient(selected)?;
    orchestrator.attach_image(image)?;

    let validation = orchestrator.run_stage1().await?;
    let passed = validation.as_ref().is_some_and(|v| v.valid);
    if !passed && !plan.force {
        return Ok(render(orchestrator.session()));
    }

    let detection = orchestrator.run_stage2().await?;
    if detection.is_some() && !plan.skip_analysis {
        orchestrator.run_stage3().await?;
    }
    Ok(render(orchestrator.session()))
}

// ═══════════════════════════════════════════════════════════
// Text rendering
// ═══════════════════════════════════════════════════════════

pub fn status_text(snapshot: &HealthSnapshot) -> String {
    let up = |ok: bool| if ok { "up" } else { "down" };
    let mut s = String::new();
    let _ = writeln!(s, "{}", snapshot.status.label());
    let _ = writeln!(s, "  backend: {}", up(snapshot.backend_up));
    let _ = writeln!(s, "  ai:      {}", up(snapshot.ai_up));
    if let Some(at) = snapshot.checked_at {
        let _ = writeln!(s, "  checked: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    s
}

pub fn table_text(table: &PatientTable) -> String {
    if let Some(message) = &table.empty_message {
        return format!("{message}\n");
    }
    let mut s = String::new();
    let _ = writeln!(
        s,
        "{:<12} {:<24} {:<14} {:<12} {:<24} CREATED",
        "ID", "NAME", "PHONE", "DOB", "ADDRESS"
    );
    for row in &table.rows {
        let _ = writeln!(
            s,
            "{:<12} {:<24} {:<14} {:<12} {:<24} {}",
            row.id, row.name, row.phone, row.date_of_birth, row.address, row.created_at
        );
    }
    s
}

pub fn detail_text(detail: &PatientDetail) -> String {
    format!(
        "{}\n  Name:    {}\n  Phone:   {}\n  DOB:     {}\n  Address: {}\n",
        detail.id, detail.name, detail.phone, detail.date_of_birth, detail.address
    )
}

fn recommendations_text(s: &mut String, items: &[RecommendationView]) {
    for rec in items {
        let _ = writeln!(s, "  {}. {} ({})", rec.number, rec.vitamin, rec.association_label);
        let _ = writeln!(s, "     {}", rec.medical_note);
        let _ = writeln!(s, "     Foods: {}", rec.foods);
        if !rec.notes.is_empty() {
            let _ = writeln!(s, "     Notes: {}", rec.notes);
        }
        let _ = writeln!(s, "     Source: {}", rec.source);
    }
}

pub fn diagnostic_text(view: &DiagnosticView) -> String {
    let mut s = String::new();
    if let Some(patient) = &view.patient {
        match &patient.name {
            Some(name) => {
                let _ = writeln!(s, "Patient: {} ({name})", patient.patient_id);
            }
            None => {
                let _ = writeln!(s, "Patient: {}", patient.patient_id);
            }
        }
    }
    if let Some(info) = &view.image_info {
        let _ = writeln!(s, "Image:   {} ({}, {})", info.filename, info.size, info.status);
    }

    let last = view.cards.len().saturating_sub(1);
    for (index, card) in view.cards.iter().enumerate() {
        let _ = writeln!(s, "\n== {} ==", card.title);
        for line in &card.lines {
            let _ = writeln!(s, "  {line}");
        }
        for section in &card.sections {
            let _ = writeln!(s, "  {}: {}", section.heading, section.text);
        }
        if let Some(meter) = &card.meter {
            let _ = writeln!(s, "  {}", meter.label);
        }
        recommendations_text(&mut s, &card.recommendations);
        if let Some(footer) = &card.footer {
            let _ = writeln!(s, "  {footer}");
        }
        // Only the newest card's action is still actionable.
        if let Some(action) = card.action.as_ref().filter(|a| a.enabled && index == last) {
            let _ = writeln!(s, "  Next: {}", action.label);
        }
    }
    s
}

fn deficiencies_text(s: &mut String, list: &DeficiencyList) {
    if let Some(heading) = &list.heading {
        let _ = writeln!(s, "{heading}");
    }
    recommendations_text(s, &list.items);
    if let Some(message) = &list.empty_message {
        let _ = writeln!(s, "  {message}");
    }
}

pub fn dashboard_text(view: &DashboardView) -> String {
    let mut s = String::new();
    match &view.patient {
        Some(detail) => s.push_str(&detail_text(detail)),
        None => {
            let _ = writeln!(s, "{}", view.patient_id);
        }
    }

    let _ = writeln!(s, "\nLatest report");
    match &view.latest {
        LatestReportView::Empty { title, message } => {
            let _ = writeln!(s, "  {title}: {message}");
        }
        LatestReportView::Report {
            date,
            disease,
            confidence,
            deficiencies,
        } => {
            let _ = writeln!(s, "  {date}  {disease}  confidence {confidence}%");
            deficiencies_text(&mut s, deficiencies);
        }
    }

    let _ = writeln!(s, "\n{}", view.history.total_label);
    for item in &view.history.items {
        let _ = writeln!(s, "  #{:<3} {} {:>5}  {}", item.number, item.date, item.time, item.disease);
    }
    if let Some(message) = &view.history.empty_message {
        let _ = writeln!(s, "  {message}");
    }

    let _ = writeln!(s, "\nAnalytics");
    match &view.analytics {
        AnalyticsView::Empty { title, message } => {
            let _ = writeln!(s, "  {title}: {message}");
        }
        AnalyticsView::Charts { charts } => {
            for chart in charts {
                let _ = writeln!(s, "  {:?} ({:?})", chart.slot, chart.kind);
                for (label, value) in chart.labels.iter().zip(&chart.values) {
                    let _ = writeln!(s, "    {label:<20} {value}");
                }
            }
        }
    }
    s
}
