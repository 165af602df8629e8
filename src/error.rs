//! Client error taxonomy shared by every remote call and local input check.
//!
//! Every variant is recoverable: call sites turn it into a notice and the
//! session stays interactive.

use serde::Serialize;
use thiserror::Error;

/// Broad category of a [`ClientError`], used for notice routing and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Network,
    Server,
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// Bad local input: missing ID, oversized or non-image file.
    #[error("{0}")]
    Validation(String),

    /// Transport failure or timeout before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response, or a 2xx response reporting failure.
    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Rejected image upload (wrong type or too large).
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Io(_) => ErrorKind::Validation,
            Self::Network(_) => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
        }
    }

    /// Whether the server answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Server { status: 404, .. })
    }

    /// Short message suitable for a notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Network(_) => "Connection error. Please try again.".to_string(),
            Self::Server { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Server { status, .. } => format!("Request failed (status {status})"),
            Self::Io(e) => format!("Could not read file: {e}"),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::Network(format!("service unreachable: {e}"))
        } else if e.is_decode() {
            Self::Server {
                status: e.status().map(|s| s.as_u16()).unwrap_or(200),
                message: format!("Malformed response: {e}"),
            }
        } else if let Some(status) = e.status() {
            Self::Server {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            Self::Network(e.to_string())
        }
    }
}
