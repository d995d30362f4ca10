//! Driver abstraction and the dialect-aware handle built on top of it.

use crate::config::OrmConfig;
use crate::dialect::{Dialect, quote_standard_string};
use crate::error::OrmResult;
use crate::monitor::{StatementKind, log_failure, log_statement};
use crate::record::Record;
use crate::value::Value;
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::TryStreamExt;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

/// A database driver.
///
/// Statements use `?` positional placeholders; drivers whose wire protocol wants a
/// different style translate before sending. Implement this for any client that
/// should take part in the registry.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Driver name used to pick the [`Dialect`] (`"mysql"`, `"sqlite"`, `"pgsql"`).
    fn driver_name(&self) -> &str;

    /// Prepare, bind and execute a statement, returning a forward-only cursor.
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<RowStream>;

    /// Execute a statement and return the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64>;

    /// Execute a statement without parameters.
    async fn execute_raw(&self, sql: &str) -> OrmResult<u64> {
        self.execute(sql, &[]).await
    }

    /// The most recently generated auto-increment value on this connection.
    async fn last_insert_id(&self) -> OrmResult<Option<Value>>;

    /// Quote a string as an SQL literal.
    fn quote_string(&self, s: &str) -> String {
        quote_standard_string(s)
    }
}

/// A stream of rows returned by [`Connection::query`].
pub struct RowStream {
    inner: Pin<Box<dyn Stream<Item = OrmResult<Record>> + Send>>,
}

impl RowStream {
    /// Create a new `RowStream` from any compatible stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = OrmResult<Record>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// A stream over rows that are already in memory.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self::new(futures_util::stream::iter(records.into_iter().map(Ok)))
    }

    pub fn empty() -> Self {
        Self::from_records(Vec::new())
    }
}

impl Stream for RowStream {
    type Item = OrmResult<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

/// A registered connection together with its resolved dialect.
///
/// Cloning is cheap; every clone shares the same driver.
#[derive(Clone)]
pub struct Database {
    conn: Arc<dyn Connection>,
    dialect: Dialect,
    config: Arc<OrmConfig>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.conn.driver_name())
            .field("dialect", &self.dialect)
            .finish()
    }
}

impl Database {
    /// Wrap a driver using the default configuration.
    pub fn new<C: Connection + 'static>(conn: C) -> OrmResult<Self> {
        Self::with_config(Arc::new(conn), Arc::new(OrmConfig::default()))
    }

    /// Wrap a shared driver. Fails when the driver name maps to no known dialect.
    pub fn with_config(conn: Arc<dyn Connection>, config: Arc<OrmConfig>) -> OrmResult<Self> {
        let dialect = Dialect::detect(conn.driver_name())?;
        Ok(Self {
            conn,
            dialect,
            config,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    pub fn quote_identifier(&self, identifier: &str) -> String {
        self.dialect.quote_identifier(identifier)
    }

    /// Render `value` as an SQL literal for this connection.
    pub fn quote(&self, value: &Value) -> String {
        self.dialect.quote_literal(value, self.conn.as_ref())
    }

    pub async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<RowStream> {
        let start = Instant::now();
        match self.conn.query(sql, params).await {
            Ok(rows) => {
                log_statement(
                    &self.config,
                    self.dialect,
                    StatementKind::Query,
                    sql,
                    params.len(),
                    start.elapsed(),
                );
                Ok(rows)
            }
            Err(e) => {
                log_failure(&self.config, self.dialect, sql, &e);
                Err(e)
            }
        }
    }

    pub async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let start = Instant::now();
        let result = if params.is_empty() {
            self.conn.execute_raw(sql).await
        } else {
            self.conn.execute(sql, params).await
        };
        match result {
            Ok(affected) => {
                log_statement(
                    &self.config,
                    self.dialect,
                    StatementKind::Execute,
                    sql,
                    params.len(),
                    start.elapsed(),
                );
                Ok(affected)
            }
            Err(e) => {
                log_failure(&self.config, self.dialect, sql, &e);
                Err(e)
            }
        }
    }

    pub async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        self.conn.last_insert_id().await
    }

    /// Insert `values` into `table`, merging into an existing row when `merge` is set.
    ///
    /// Literals are inlined through [`Database::quote`]. For a fresh insert that
    /// leaves `generated_id` to the database, the stored value of that column is
    /// returned: read back from the insert itself where the dialect supports
    /// `RETURNING`, otherwise from the driver's last insert id.
    pub async fn upsert(
        &self,
        table: &str,
        id_columns: &[&str],
        values: &[(&str, Value)],
        merge: bool,
        generated_id: Option<&str>,
    ) -> OrmResult<Option<Value>> {
        let literals = values
            .iter()
            .map(|(c, v)| (*c, self.quote(v)))
            .collect::<Vec<_>>();
        let strategy = self.dialect.upsert_strategy();
        let mut sql = strategy.render(table, id_columns, &literals, merge);
        let id_column = match generated_id {
            Some(column) if !merge => column,
            _ => {
                self.execute(&sql, &[]).await?;
                return Ok(None);
            }
        };
        match strategy.returning(id_column) {
            Some(returning) => {
                sql.push_str(&returning);
                let mut rows = self.query(&sql, &[]).await?;
                let id = rows
                    .try_next()
                    .await?
                    .and_then(Record::into_first_value)
                    .filter(|id| !id.is_null());
                Ok(id)
            }
            None => {
                self.execute(&sql, &[]).await?;
                self.last_insert_id().await
            }
        }
    }
}
