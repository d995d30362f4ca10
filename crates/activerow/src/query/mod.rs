//! Raw SQL execution and row materialization.
//!
//! [`Query`] runs a caller-supplied statement with `?` positional parameters.
//! [`QueryBuilder`] assembles the statement from builder state and delegates to
//! the same execution path. Results come back as a [`ResultIter`] (single pass,
//! rows pulled on demand) or fully collected via `find_all`.
//!
//! # Example
//!
//! ```ignore
//! use activerow::{Query, Record};
//!
//! let mut q: Query<Record> = Query::with_sql(db, "SELECT name FROM users WHERE id = ?");
//! q.bind(7);
//! let name = q.find_column().await?;
//! ```

mod builder;
mod iter;

pub use builder::QueryBuilder;
pub use iter::ResultIter;

use crate::client::{Database, RowStream};
use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use crate::row::FromRow;
use crate::value::Value;
use futures_util::StreamExt;
use std::fmt;
use std::marker::PhantomData;

/// A raw SQL statement bound to a connection.
///
/// `T` is the materialization target: [`Record`] for generic rows, an entity, or
/// any `FromRow` type for ad-hoc result shapes.
#[must_use]
pub struct Query<T = Record> {
    db: Database,
    sql: Option<String>,
    params: Vec<Value>,
    cursor: Option<RowStream>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("executed", &self.cursor.is_some())
            .finish()
    }
}

impl<T: FromRow> Query<T> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            sql: None,
            params: Vec::new(),
            cursor: None,
            _marker: PhantomData,
        }
    }

    pub fn with_sql(db: Database, sql: impl Into<String>) -> Self {
        let mut q = Self::new(db);
        q.sql = Some(sql.into());
        q
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn set_query(&mut self, sql: impl Into<String>) -> &mut Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    pub fn set_params<I, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Append one positional parameter.
    pub fn bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.params.push(value.into());
        self
    }

    /// Prepare, bind and execute the stored statement.
    ///
    /// Any cursor left over from a previous execution is dropped first.
    pub async fn execute(&mut self) -> OrmResult<()> {
        self.cursor = None;
        let sql = self
            .sql
            .as_deref()
            .ok_or_else(|| OrmError::usage("no SQL statement set on query"))?;
        self.cursor = Some(self.db.query(sql, &self.params).await?);
        Ok(())
    }

    /// Pull one row from the active cursor. `None` once the rows are exhausted.
    pub async fn fetch(&mut self) -> OrmResult<Option<T>> {
        match self.fetch_record().await? {
            Some(row) => self.instance_from_row(row).map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_record(&mut self) -> OrmResult<Option<Record>> {
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| OrmError::usage("fetch called before execute"))?;
        cursor.next().await.transpose()
    }

    /// Materialize a row as `T`.
    pub fn instance_from_row(&self, row: Record) -> OrmResult<T> {
        T::from_row(row)
    }

    /// First column of the first row. SQL `NULL` and "no rows" both yield `None`.
    pub async fn find_column(&mut self) -> OrmResult<Option<Value>> {
        self.execute().await?;
        let value = self
            .fetch_record()
            .await?
            .and_then(Record::into_first_value)
            .filter(|v| !v.is_null());
        self.cursor = None;
        Ok(value)
    }

    /// First row, if any. "No rows" is not an error.
    pub async fn find_one(&mut self) -> OrmResult<Option<T>> {
        self.execute().await?;
        let row = self.fetch().await;
        self.cursor = None;
        row
    }

    /// Execute and hand the cursor to a single-pass iterator.
    pub async fn find_many(&mut self) -> OrmResult<ResultIter<T>> {
        self.execute().await?;
        let cursor = self.cursor.take().unwrap_or_else(RowStream::empty);
        Ok(ResultIter::new(cursor))
    }

    /// Every row, collected in memory.
    pub async fn find_all(&mut self) -> OrmResult<Vec<T>> {
        self.find_many().await?.collect_all().await
    }

    /// Number of rows the statement returns, counted client-side by draining the cursor.
    pub async fn count(&mut self) -> OrmResult<u64> {
        self.execute().await?;
        let mut n = 0u64;
        while self.fetch_record().await?.is_some() {
            n += 1;
        }
        self.cursor = None;
        Ok(n)
    }
}

#[cfg(test)]
mod tests;
