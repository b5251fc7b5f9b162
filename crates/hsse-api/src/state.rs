//! # Application State
//!
//! Shared state for the Axum application: the workflow store, the clock
//! every mutation reads "now" from, and the service configuration.

use std::sync::Arc;

use hsse_core::{Clock, SystemClock};
use hsse_state::{InMemoryStore, WorkflowStore};

/// Log output format for the service binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read `HSSE_HOST`, `HSSE_PORT` and `HSSE_LOG_FORMAT`, keeping defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(host) = lookup("HSSE_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("HSSE_PORT") {
            config.port = port
                .parse()
                .map_err(|e| format!("HSSE_PORT must be a port number, got {port:?}: {e}"))?;
        }
        if let Some(format) = lookup("HSSE_LOG_FORMAT") {
            config.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "" => LogFormat::Text,
                other => return Err(format!("HSSE_LOG_FORMAT must be text or json, got {other:?}")),
            };
        }
        Ok(config)
    }

    /// `host:port` for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WorkflowStore>,
    pub clock: Arc<dyn Clock>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory store and wall clock.
    pub fn new(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// In-memory store driven by the given clock.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            clock,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
