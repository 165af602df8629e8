//! In-process stand-ins for the backend and AI service, used by tests.
//!
//! Each fake binds `127.0.0.1:0`, serves an axum router on the test's tokio
//! runtime and shuts down when dropped.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::models::{Patient, PatientDraft, Report};

/// A running fake service.
pub struct FakeServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeServer {
    pub async fn start(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("fake server addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, prefix: &str) -> String {
        format!("http://{}{}", self.addr, prefix)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// An address nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// ── Backend ────────────────────────────────────────────────────────────────

/// Mutable state behind the fake backend.
#[derive(Default)]
pub struct BackendState {
    pub patients: Vec<Patient>,
    pub reports: Vec<Report>,
    pub analytics: Value,
    pub stage3_requests: Vec<Value>,
    pub next_id: u32,
}

pub type SharedBackend = Arc<Mutex<BackendState>>;

pub fn backend_router(state: SharedBackend) -> Router {
    Router::new()
        .route("/api/health", get(|| async { Json(json!({"status": "healthy", "service": "backend"})) }))
        .route("/api/patients/all", get(list_patients))
        .route("/api/patients/create", post(create_patient))
        .route("/api/patients/update", put(update_patient))
        .route("/api/patients/:id", get(get_patient).delete(delete_patient))
        .route("/api/reports/:id", get(reports))
        .route("/api/analytics/:id", get(analytics))
        .route("/api/analyze_stage3", post(analyze_stage3))
        .with_state(state)
}

async fn list_patients(State(state): State<SharedBackend>) -> Json<Value> {
    let state = state.lock().unwrap();
    let rows: Vec<Value> = state
        .patients
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "phone": p.phone.clone().unwrap_or_default(),
                "date_of_birth": p.date_of_birth.clone().unwrap_or_default(),
                "address": p.address.clone().unwrap_or_default(),
                "created_at": p.created_at,
            })
        })
        .collect();
    Json(Value::Array(rows))
}

async fn get_patient(State(state): State<SharedBackend>, Path(id): Path<String>) -> Response {
    let state = state.lock().unwrap();
    match state.patients.iter().find(|p| p.id == id) {
        Some(p) => Json(json!(p)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "Patient not found"}))).into_response(),
    }
}

async fn create_patient(State(state): State<SharedBackend>, Json(draft): Json<PatientDraft>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let id = format!("PAVIT-{:05}", state.next_id);
    state.next_id += 1;
    state.patients.push(Patient {
        id: id.clone(),
        name: draft.name,
        phone: draft.phone,
        date_of_birth: draft.date_of_birth,
        address: draft.address,
        created_at: "2024-06-01 08:00:00".into(),
    });
    Json(json!({"status": "success", "patient_id": id}))
}

async fn update_patient(State(state): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let id = body["patient_id"].as_str().unwrap_or_default().to_string();
    let Some(p) = state.patients.iter_mut().find(|p| p.id == id) else {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "no such patient"}))).into_response();
    };
    p.name = body["name"].as_str().unwrap_or_default().to_string();
    p.phone = body["phone"].as_str().map(str::to_string);
    p.date_of_birth = body["date_of_birth"].as_str().map(str::to_string);
    p.address = body["address"].as_str().map(str::to_string);
    Json(json!({"status": "success"})).into_response()
}

async fn delete_patient(State(state): State<SharedBackend>, Path(id): Path<String>) -> Json<Value> {
    state.lock().unwrap().patients.retain(|p| p.id != id);
    Json(json!({"status": "success"}))
}

async fn reports(State(state): State<SharedBackend>, Path(id): Path<String>) -> Json<Value> {
    let state = state.lock().unwrap();
    let rows: Vec<&Report> = state
        .reports
        .iter()
        .filter(|r| r.patient_id.as_deref() == Some(id.as_str()))
        .collect();
    Json(json!(rows))
}

async fn analytics(State(state): State<SharedBackend>, Path(_id): Path<String>) -> Json<Value> {
    let state = state.lock().unwrap();
    if state.analytics.is_null() {
        return Json(json!({"vitamins": {}, "diseases": {}, "monthly": {}}));
    }
    Json(state.analytics.clone())
}

async fn analyze_stage3(State(state): State<SharedBackend>, mut multipart: Multipart) -> Response {
    let mut fields = serde_json::Map::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let text = field.text().await.unwrap_or_default();
        fields.insert(name, Value::String(text));
    }
    let request = Value::Object(fields);
    state.lock().unwrap().stage3_requests.push(request.clone());

    let (Some(patient_id), Some(disease)) = (
        request["patient_id"].as_str().filter(|s| !s.is_empty()),
        request["disease"].as_str().filter(|s| !s.is_empty()),
    ) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Missing patient ID or disease"}))).into_response();
    };
    let confidence: f64 = request["confidence"].as_str().and_then(|c| c.parse().ok()).unwrap_or(0.5);

    Json(json!({
        "status": "success",
        "report_id": 1,
        "detected_disease": disease,
        "confidence": confidence,
        "patient": patient_id,
        "nutrition_recommendations": [{
            "vitamin": "Vitamin B12",
            "association_strength": 0.8,
            "confidence_note": "Moderate evidence",
            "foods": ["eggs", "fish"],
            "notes": "Supports skin repair",
            "source_type": "clinical_study"
        }]
    }))
    .into_response()
}

// ── AI service ─────────────────────────────────────────────────────────────

/// Canned responses for the fake AI service.
#[derive(Clone)]
pub struct AiScript {
    pub validate: (StatusCode, Value),
    pub detect: (StatusCode, Value),
    pub received: Arc<Mutex<Vec<(String, String, usize)>>>,
}

impl Default for AiScript {
    fn default() -> Self {
        Self {
            validate: (StatusCode::OK, json!({"valid": true, "caption": "a close up of skin", "reason": "Biological content detected"})),
            detect: (StatusCode::OK, json!({"success": true, "disease": "eczema", "confidence": 0.87})),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

pub fn ai_router(script: AiScript) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "blip_loaded": true})) }))
        .route("/validate", post(validate))
        .route("/detect", post(detect))
        .with_state(script)
}

/// Record the uploaded `image` part; `None` when it is missing.
async fn record_image(script: &AiScript, mut multipart: Multipart) -> Option<()> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let mime = field.content_type().unwrap_or_default().to_string();
            let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            script.received.lock().unwrap().push((filename, mime, len));
            return Some(());
        }
    }
    None
}

async fn validate(State(script): State<AiScript>, multipart: Multipart) -> Response {
    if record_image(&script, multipart).await.is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"valid": false, "message": "No image provided"}))).into_response();
    }
    let (status, body) = script.validate.clone();
    (status, Json(body)).into_response()
}

async fn detect(State(script): State<AiScript>, multipart: Multipart) -> Response {
    if record_image(&script, multipart).await.is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"success": false, "message": "No image provided"}))).into_response();
    }
    let (status, body) = script.detect.clone();
    (status, Json(body)).into_response()
}
