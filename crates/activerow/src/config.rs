//! Runtime configuration shared by a [`ConnectionRegistry`](crate::ConnectionRegistry).

use serde::Deserialize;
use std::time::Duration;

/// Name used when an entity does not pick a connection.
pub const DEFAULT_CONNECTION: &str = "default";

/// Configuration for statement logging and connection lookup.
///
/// Deserializable so it can live in an application's settings file; missing
/// keys fall back to [`OrmConfig::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Connection name returned by `ConnectionRegistry::default_connection`.
    pub default_connection: String,
    /// Whether to emit a `tracing` event per executed statement.
    pub log_statements: bool,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_logged_sql_length: Option<usize>,
    /// Statements slower than this are logged at WARN.
    pub slow_statement_threshold_ms: Option<u64>,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            default_connection: DEFAULT_CONNECTION.to_string(),
            log_statements: true,
            max_logged_sql_length: Some(200),
            slow_statement_threshold_ms: None,
        }
    }
}

impl OrmConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_connection(mut self, name: impl Into<String>) -> Self {
        self.default_connection = name.into();
        self
    }

    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_logged_sql_length(mut self, len: usize) -> Self {
        self.max_logged_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql_length = None;
        self
    }

    /// Set the slow statement threshold.
    pub fn slow_statement_threshold(mut self, threshold: Duration) -> Self {
        self.slow_statement_threshold_ms = Some(threshold.as_millis() as u64);
        self
    }

    pub fn slow_threshold(&self) -> Option<Duration> {
        self.slow_statement_threshold_ms.map(Duration::from_millis)
    }
}
