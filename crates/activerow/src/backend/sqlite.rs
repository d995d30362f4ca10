//! SQLite backend over `rusqlite`.
//!
//! `rusqlite` is synchronous, so every call runs on tokio's blocking pool while
//! holding the connection mutex. Query rows are stepped on that blocking thread
//! and handed over through a bounded channel as the [`RowStream`] is polled; the
//! connection stays locked until the stream is exhausted or dropped.

use crate::client::{Connection, RowStream};
use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use crate::value::Value;
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, ValueRef};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::spawn_blocking;

/// Rows read ahead of the consumer.
const ROW_BUFFER: usize = 64;

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Bool(b) => ToSqlOutput::from(*b),
            Value::Int(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

fn decode_value(column: &str, value: ValueRef<'_>) -> OrmResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| OrmError::decode(column, e.to_string()))?
                .to_string(),
        ),
        ValueRef::Blob(_) => return Err(OrmError::decode(column, "blob columns are not supported")),
    })
}

type SharedConnection = Arc<Mutex<rusqlite::Connection>>;

/// A single SQLite connection usable from async code.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: SharedConnection,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection").finish_non_exhaustive()
    }
}

impl SqliteConnection {
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> OrmResult<Self> {
        Ok(Self::new(rusqlite::Connection::open(path)?))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> OrmResult<Self> {
        Ok(Self::new(rusqlite::Connection::open_in_memory()?))
    }

    /// Run several `;`-separated statements, e.g. schema setup.
    pub async fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        let sql = sql.to_owned();
        run_blocking(Arc::clone(&self.conn), move |conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
    }
}

async fn run_blocking<F, R>(conn: SharedConnection, func: F) -> OrmResult<R>
where
    F: FnOnce(&mut rusqlite::Connection) -> OrmResult<R> + Send + 'static,
    R: Send + 'static,
{
    let mut guard = conn.lock_owned().await;
    spawn_blocking(move || func(&mut guard))
        .await
        .map_err(|e| OrmError::Other(format!("sqlite spawn_blocking join error: {e}")))?
}

fn decode_record(columns: &[String], row: &rusqlite::Row<'_>) -> OrmResult<Record> {
    let mut record = Record::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        record.set(name.as_str(), decode_value(name, row.get_ref(idx)?)?);
    }
    Ok(record)
}

/// Prepare and bind on the blocking thread, report that through `ready`, then
/// push rows until they run out, one fails, or the receiver goes away.
fn stream_rows(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
    ready: oneshot::Sender<OrmResult<()>>,
    rows_tx: mpsc::Sender<OrmResult<Record>>,
) {
    let mut stmt = match conn.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };
    let columns = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut rows = match stmt.query(rusqlite::params_from_iter(params.iter())) {
        Ok(rows) => rows,
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }
    loop {
        let item = match rows.next() {
            Ok(Some(row)) => decode_record(&columns, row),
            Ok(None) => break,
            Err(e) => Err(e.into()),
        };
        let failed = item.is_err();
        if rows_tx.blocking_send(item).is_err() || failed {
            break;
        }
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<RowStream> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (rows_tx, mut rows_rx) = mpsc::channel(ROW_BUFFER);
        let guard = Arc::clone(&self.conn).lock_owned().await;
        spawn_blocking(move || stream_rows(&guard, &sql, &params, ready_tx, rows_tx));
        ready_rx
            .await
            .map_err(|_| OrmError::Other("sqlite reader stopped before executing".to_string()))??;
        Ok(RowStream::new(futures_util::stream::poll_fn(move |cx| {
            rows_rx.poll_recv(cx)
        })))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        run_blocking(Arc::clone(&self.conn), move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let affected = stmt.execute(rusqlite::params_from_iter(params.iter()))?;
            Ok(affected as u64)
        })
        .await
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        run_blocking(Arc::clone(&self.conn), |conn| {
            Ok(Some(Value::Int(conn.last_insert_rowid())))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    #[tokio::test]
    async fn query_decodes_storage_classes() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let rows: Vec<Record> = conn
            .query("SELECT 1 AS i, 1.5 AS f, 'x' AS t, NULL AS n, ? AS p", &[Value::Bool(true)])
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("i"), &Value::Int(1));
        assert_eq!(row.get("f"), &Value::Float(1.5));
        assert_eq!(row.get("t"), &Value::Text("x".into()));
        assert!(row.get("n").is_null());
        assert_eq!(row.get("p"), &Value::Int(1));
    }

    #[tokio::test]
    async fn rows_arrive_before_a_later_decode_error() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let mut rows = conn
            .query(
                "SELECT v AS b FROM (SELECT 1 AS k, 1 AS v UNION ALL SELECT 2, 2 \
                 UNION ALL SELECT 3, x'00') ORDER BY k",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(rows.try_next().await.unwrap().unwrap().get("b"), &Value::Int(1));
        assert_eq!(rows.try_next().await.unwrap().unwrap().get("b"), &Value::Int(2));
        let err = rows.try_next().await.unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "b"));
        assert!(rows.try_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unbounded_query_streams_and_releases_on_drop() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let mut rows = conn
            .query(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n) SELECT i FROM n",
                &[],
            )
            .await
            .unwrap();
        for expected in 1..=3 {
            let row = rows.try_next().await.unwrap().unwrap();
            assert_eq!(row.get("i"), &Value::Int(expected));
        }
        drop(rows);

        let n = conn.execute("CREATE TABLE t (id INTEGER)", &[]).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn prepare_errors_fail_the_call() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let err = conn.query("SELECT * FROM missing", &[]).await.unwrap_err();
        assert!(matches!(err, OrmError::Sqlite(_)));
    }

    #[tokio::test]
    async fn execute_reports_affected_rows_and_rowid() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();
        let n = conn
            .execute("INSERT INTO t (name) VALUES (?), (?)", &["a".into(), "b".into()])
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(conn.last_insert_id().await.unwrap(), Some(Value::Int(2)));
    }
}
