//! SQL dialect detection and quoting.
//!
//! Every connection is classified once, at registration, from its driver name.
//! Identifiers are quoted with backticks on MySQL and with standard double quotes
//! everywhere else; literals are rendered inline for statements that are not
//! parameterized (entity writes).

mod upsert;

pub use upsert::{MySqlUpsert, PostgresUpsert, SqliteUpsert, UpsertStrategy};

use crate::client::Connection;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// The SQL flavour spoken by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Resolve a dialect from a driver name such as `"mysql"`, `"sqlite"` or `"pgsql"`.
    pub fn detect(driver_name: &str) -> OrmResult<Self> {
        match driver_name.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "pgsql" | "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(OrmError::config(format!("unsupported driver \"{other}\""))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "pgsql",
        }
    }

    /// Whether the dialect has `TRUE` / `FALSE` literals.
    pub fn has_boolean_literals(&self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Quote an identifier, doubling any embedded quote character.
    ///
    /// The input is taken verbatim: `"a.b"` becomes one identifier, not two.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        let quote = match self {
            Dialect::MySql => '`',
            Dialect::Sqlite | Dialect::Postgres => '"',
        };
        let mut out = String::with_capacity(identifier.len() + 2);
        out.push(quote);
        for ch in identifier.chars() {
            if ch == quote {
                out.push(quote);
            }
            out.push(ch);
        }
        out.push(quote);
        out
    }

    /// Render a value as an SQL literal.
    ///
    /// Text goes through the connection's own string quoting so driver-specific
    /// escaping rules (MySQL backslashes) are honored.
    pub fn quote_literal(&self, value: &Value, conn: &dyn Connection) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) if self.has_boolean_literals() => {
                (if *b { "TRUE" } else { "FALSE" }).to_string()
            }
            Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => format_float(*f),
            Value::Float(f) => conn.quote_string(&f.to_string()),
            Value::Text(s) => conn.quote_string(s),
        }
    }

    /// The insert/merge statement builder for this dialect.
    pub fn upsert_strategy(&self) -> &'static dyn UpsertStrategy {
        match self {
            Dialect::MySql => &MySqlUpsert,
            Dialect::Sqlite => &SqliteUpsert,
            Dialect::Postgres => &PostgresUpsert,
        }
    }
}

/// Float literals always carry a decimal point or exponent so the server
/// does not parse them back as integers.
fn format_float(f: f64) -> String {
    let s = f.to_string();
    if s.contains(['.', 'e', 'E']) {
        s
    } else {
        format!("{s}.0")
    }
}

/// Standard SQL string literal: single quotes, embedded quotes doubled.
pub fn quote_standard_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}
