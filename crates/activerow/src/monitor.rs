//! Statement logging via `tracing`.
//!
//! Every statement executed through a [`Database`](crate::Database) is reported on the
//! `activerow.sql` target. No subscriber is installed here; applications choose one.

use crate::config::OrmConfig;
use crate::dialect::Dialect;
use std::time::Duration;

pub(crate) const SQL_TARGET: &str = "activerow.sql";

/// Truncate a string to at most `max_bytes` without splitting a UTF-8 code point.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// The kind of call that produced a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Rows are expected back.
    Query,
    /// Only an affected-row count is expected.
    Execute,
}

fn display_sql(config: &OrmConfig, sql: &str) -> String {
    match config.max_logged_sql_length {
        Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
        _ => sql.to_string(),
    }
}

/// Emit the per-statement events.
pub(crate) fn log_statement(
    config: &OrmConfig,
    dialect: Dialect,
    kind: StatementKind,
    sql: &str,
    param_count: usize,
    elapsed: Duration,
) {
    if !config.log_statements {
        return;
    }
    let sql = display_sql(config, sql);
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    match config.slow_threshold() {
        Some(threshold) if elapsed >= threshold => tracing::warn!(
            target: SQL_TARGET,
            dialect = dialect.name(),
            kind = ?kind,
            param_count,
            elapsed_ms,
            sql = %sql,
            "slow statement",
        ),
        _ => tracing::debug!(
            target: SQL_TARGET,
            dialect = dialect.name(),
            kind = ?kind,
            param_count,
            elapsed_ms,
            sql = %sql,
        ),
    }
}

/// Emit a failed-statement event.
pub(crate) fn log_failure(config: &OrmConfig, dialect: Dialect, sql: &str, error: &dyn std::fmt::Display) {
    if !config.log_statements {
        return;
    }
    tracing::debug!(
        target: SQL_TARGET,
        dialect = dialect.name(),
        sql = %display_sql(config, sql),
        error = %error,
        "statement failed",
    );
}
