//! System status: both services' `/health` endpoints, checked in parallel,
//! once on demand or periodically from a background task.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::client::{AiService, AiServiceClient, Backend, BackendClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// No check has completed yet.
    Unknown,
    Online,
    /// At least one service is down.
    Partial,
}

impl SystemStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Checking...",
            Self::Online => "System Online",
            Self::Partial => "System Partial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub status: SystemStatus,
    pub backend_up: bool,
    pub ai_up: bool,
    pub checked_at: Option<DateTime<Utc>>,
}

impl HealthSnapshot {
    pub fn unknown() -> Self {
        Self {
            status: SystemStatus::Unknown,
            backend_up: false,
            ai_up: false,
            checked_at: None,
        }
    }

    fn from_probes(backend_up: bool, ai_up: bool) -> Self {
        let status = if backend_up && ai_up {
            SystemStatus::Online
        } else {
            SystemStatus::Partial
        };
        Self {
            status,
            backend_up,
            ai_up,
            checked_at: Some(Utc::now()),
        }
    }
}

/// Probe both services concurrently. Any failure counts as down.
pub async fn check_system_status<A: AiService, B: Backend>(ai: &A, backend: &B) -> HealthSnapshot {
    let (backend_res, ai_res) = tokio::join!(backend.health(), ai.health());
    log_probe("backend", &backend_res);
    log_probe("ai", &ai_res);
    HealthSnapshot::from_probes(backend_res.is_ok(), ai_res.is_ok())
}

fn log_probe<T>(service: &str, result: &Result<T, crate::error::ClientError>) {
    if let Err(e) = result {
        tracing::debug!(service, error = %e, "Health probe failed");
    }
}

// ═══════════════════════════════════════════════════════════
// HealthMonitor
// ═══════════════════════════════════════════════════════════

/// Handle for the background status task.
///
/// Stops on `shutdown()` or when dropped.
pub struct HealthMonitor {
    status_rx: watch::Receiver<HealthSnapshot>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    /// Check immediately, then every `interval`. Must be called inside a
    /// tokio runtime.
    pub fn spawn(ai: AiServiceClient, backend: BackendClient, interval: Duration) -> Self {
        let (status_tx, status_rx) = watch::channel(HealthSnapshot::unknown());
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs(), "Health monitor started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let snapshot = check_system_status(&ai, &backend).await;
                        let changed = status_tx.borrow().status != snapshot.status;
                        if changed {
                            tracing::info!(status = snapshot.status.label(), "System status changed");
                        }
                        if status_tx.send(snapshot).is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Health monitor stopped");
        });

        Self {
            status_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Latest snapshot.
    pub fn current(&self) -> HealthSnapshot {
        self.status_rx.borrow().clone()
    }

    /// Receiver that is notified on every completed check.
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.status_rx.clone()
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn signal_stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
