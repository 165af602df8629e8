use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Vitalens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default backend REST root (patients, reports, analytics, stage 3).
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Default AI service root (validation, detection).
pub const DEFAULT_AI_URL: &str = "http://localhost:5001";

/// Largest image accepted for upload: 10 MiB.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// How long a notice stays visible before it expires.
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(5);

/// Interval between background health checks.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Connect timeout for both services.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-request timeout. Detection on CPU-only hosts can take a while.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Session key under which the logged-in patient ID is stored.
pub const SESSION_PATIENT_KEY: &str = "patient_id";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "vitalens=debug,vitalens_lib=debug"
    } else {
        "vitalens=info,vitalens_lib=info"
    }
}

/// Get the application data directory.
///
/// `VITALENS_DATA_DIR` overrides the default `~/Vitalens/`.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VITALENS_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// File backing the terminal session store.
pub fn session_file() -> PathBuf {
    app_data_dir().join("session.json")
}

/// Endpoints and timeouts for the two remote services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub api_url: String,
    pub ai_url: String,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ai_url: DEFAULT_AI_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ServiceConfig {
    /// Build from `VITALENS_API_URL`, `VITALENS_AI_URL` and
    /// `VITALENS_TIMEOUT_SECS`, falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_url = lookup("VITALENS_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.api_url);
        let ai_url = lookup("VITALENS_AI_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.ai_url);

        let request_timeout = match lookup("VITALENS_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %raw, "Ignoring invalid VITALENS_TIMEOUT_SECS");
                    defaults.request_timeout
                }
            },
            None => defaults.request_timeout,
        };

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            ai_url: ai_url.trim_end_matches('/').to_string(),
            request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_services() {
        let config = ServiceConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert_eq!(config.ai_url, "http://localhost:5001");
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn env_overrides_and_trims_trailing_slash() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("VITALENS_API_URL", "http://backend:8000/api/"),
            ("VITALENS_AI_URL", "http://ai:9000/"),
            ("VITALENS_TIMEOUT_SECS", "15"),
        ]));
        assert_eq!(config.api_url, "http://backend:8000/api");
        assert_eq!(config.ai_url, "http://ai:9000");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn invalid_timeout_falls_back_to_default() {
        let config = ServiceConfig::from_lookup(lookup_from(&[("VITALENS_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.request_timeout, Duration::from_secs(120));

        let config = ServiceConfig::from_lookup(lookup_from(&[("VITALENS_TIMEOUT_SECS", "0")]));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn blank_urls_are_ignored() {
        let config = ServiceConfig::from_lookup(lookup_from(&[("VITALENS_API_URL", "  ")]));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn max_image_is_ten_mebibytes() {
        assert_eq!(MAX_IMAGE_BYTES, 10_485_760);
    }

    #[test]
    fn session_file_lives_under_app_data() {
        let file = session_file();
        assert!(file.starts_with(app_data_dir()));
        assert!(file.ends_with("session.json"));
    }

    #[test]
    fn app_name_is_vitalens() {
        assert_eq!(APP_NAME, "Vitalens");
    }
}
