//! Short-lived user notices (success, error, warning, info).
//!
//! Notices expire after [`NOTICE_LIFETIME`] and can be dismissed early.

use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::config::NOTICE_LIFETIME;
use crate::error::{ClientError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NoticeKind {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Success => "check-circle",
            Self::Error => "exclamation-circle",
            Self::Warning => "exclamation-triangle",
            Self::Info => "info-circle",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: Uuid,
    pub kind: NoticeKind,
    pub message: String,
    pub created_at: Instant,
}

impl Notice {
    pub fn icon(&self) -> &'static str {
        self.kind.icon()
    }

    fn is_expired(&self, now: Instant, lifetime: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= lifetime
    }
}

pub struct NoticeCenter {
    notices: Vec<Notice>,
    lifetime: Duration,
}

impl NoticeCenter {
    pub fn new() -> Self {
        Self::with_lifetime(NOTICE_LIFETIME)
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            notices: Vec::new(),
            lifetime,
        }
    }

    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) -> Uuid {
        self.push_at(kind, message, Instant::now())
    }

    pub fn push_at(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) -> Uuid {
        let notice = Notice {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            created_at: now,
        };
        match kind {
            NoticeKind::Error => tracing::warn!(message = %notice.message, "Notice"),
            _ => tracing::debug!(kind = ?kind, message = %notice.message, "Notice"),
        }
        let id = notice.id;
        self.notices.push(notice);
        id
    }

    /// Error notice carrying the error's user message.
    pub fn push_error(&mut self, error: &ClientError) -> Uuid {
        tracing::debug!(kind = ?error.kind(), error = %error, "Surfacing error");
        let kind = match error.kind() {
            ErrorKind::Validation => NoticeKind::Warning,
            ErrorKind::Network | ErrorKind::Server => NoticeKind::Error,
        };
        self.push(kind, error.user_message())
    }

    /// Returns `false` when the notice was already gone.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// Drop expired notices and return the rest, oldest first.
    pub fn active(&mut self, now: Instant) -> &[Notice] {
        let lifetime = self.lifetime;
        self.notices.retain(|n| !n.is_expired(now, lifetime));
        &self.notices
    }

    /// Remove and return every notice regardless of age.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Most recent notice, expired or not.
    pub fn last(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

impl Default for NoticeCenter {
    fn default() -> Self {
        Self::new()
    }
}
