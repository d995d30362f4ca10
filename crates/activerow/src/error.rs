//! Error types for activerow

use thiserror::Error;

/// Result type alias for activerow operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Registry or driver misconfiguration (unknown driver, missing connection)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The API was called out of order or with inconsistent arguments
    #[error("Usage error: {0}")]
    Usage(String),

    /// A write was attempted that cannot produce a valid statement
    #[error("{0}")]
    WritePrecondition(String),

    /// PostgreSQL driver error
    #[cfg(feature = "postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQLite driver error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error reported by a third-party [`Connection`](crate::Connection) implementation
    #[error("Driver error{}: {message}", fmt_code(.code))]
    Driver {
        code: Option<String>,
        message: String,
    },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

fn fmt_code(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default()
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a driver error with an optional vendor code
    pub fn driver(code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Driver {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Error returned when no connection is registered under `name`.
    pub fn connection_not_found(name: &str) -> Self {
        Self::Config(format!("connection \"{name}\" not found"))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    pub fn is_write_precondition(&self) -> bool {
        matches!(self, Self::WritePrecondition(_))
    }

    /// Check if this error came from the database driver
    pub fn is_driver(&self) -> bool {
        match self {
            Self::Driver { .. } => true,
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => true,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => true,
            _ => false,
        }
    }

    /// Vendor error code, when the driver reports one (SQLSTATE for PostgreSQL).
    pub fn code(&self) -> Option<String> {
        match self {
            Self::Driver { code, .. } => code.clone(),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.code().map(|c| c.code().to_string()),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => Some(e.extended_code.to_string()),
            _ => None,
        }
    }
}
