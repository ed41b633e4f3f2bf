//! Session configuration loaded from environment variables.
//!
//! Timing windows default to the shipped values (5 s write debounce, 2 s
//! echo window) and are only overridable for development and tests.

use std::env;
use std::time::Duration;

/// Session core configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID for the Firestore-backed document store
    pub gcp_project_id: String,
    /// AI completion endpoint URL
    pub ai_endpoint: String,
    /// Optional bearer token for the AI endpoint
    pub ai_api_key: Option<String>,

    /// Quiescence window before a debounced write is flushed
    pub write_debounce: Duration,
    /// Window after a flush during which incoming snapshots are echoes
    pub echo_window: Duration,
    /// Poll interval of the Firestore document watch
    pub watch_poll_interval: Duration,
    /// AI completion request timeout
    pub ai_timeout: Duration,
}

impl Default for Config {
    /// Default config for tests and offline development.
    fn default() -> Self {
        Self {
            gcp_project_id: "local-dev".to_string(),
            ai_endpoint: "http://localhost:8787/complete".to_string(),
            ai_api_key: None,
            write_debounce: Duration::from_secs(5),
            echo_window: Duration::from_secs(2),
            watch_poll_interval: Duration::from_secs(2),
            ai_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            ai_endpoint: env::var("AI_ENDPOINT").map_err(|_| ConfigError::Missing("AI_ENDPOINT"))?,
            ai_api_key: env::var("AI_API_KEY").ok().filter(|v| !v.is_empty()),
            write_debounce: duration_var("WRITE_DEBOUNCE_MS", 5_000)?,
            echo_window: duration_var("ECHO_WINDOW_MS", 2_000)?,
            watch_poll_interval: duration_var("WATCH_POLL_INTERVAL_MS", 2_000)?,
            ai_timeout: duration_var("AI_TIMEOUT_MS", 30_000)?,
        })
    }
}

/// Read a millisecond duration from the environment with a default.
fn duration_var(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
