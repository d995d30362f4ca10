//! Scripted in-memory connection for unit tests.

use crate::client::{Connection, Database, RowStream};
use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use crate::value::Value;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    statements: Vec<(String, Vec<Value>)>,
    results: VecDeque<OrmResult<Vec<Record>>>,
    affected: VecDeque<u64>,
    last_id: Option<Value>,
}

/// Records every statement and answers queries from a queue of canned row sets.
#[derive(Clone)]
pub(crate) struct MockConnection {
    driver: &'static str,
    state: Arc<Mutex<State>>,
}

impl MockConnection {
    pub(crate) fn new(driver: &'static str) -> Self {
        Self {
            driver,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// A `Database` over a fresh mock, plus a handle for inspection.
    pub(crate) fn database(driver: &'static str) -> (Database, MockConnection) {
        let mock = Self::new(driver);
        let db = Database::new(mock.clone()).unwrap();
        (db, mock)
    }

    pub(crate) fn push_rows(&self, rows: Vec<Record>) -> &Self {
        self.state.lock().unwrap().results.push_back(Ok(rows));
        self
    }

    pub(crate) fn push_error(&self, message: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .results
            .push_back(Err(OrmError::driver(Some("42000"), message)));
        self
    }

    pub(crate) fn push_affected(&self, n: u64) -> &Self {
        self.state.lock().unwrap().affected.push_back(n);
        self
    }

    pub(crate) fn set_last_id(&self, id: impl Into<Value>) -> &Self {
        self.state.lock().unwrap().last_id = Some(id.into());
        self
    }

    pub(crate) fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().unwrap().statements.clone()
    }

    pub(crate) fn last_sql(&self) -> String {
        self.statements()
            .last()
            .map(|(sql, _)| sql.clone())
            .unwrap_or_default()
    }
}

/// Build a record from `(column, value)` pairs.
pub(crate) fn row<const N: usize>(pairs: [(&str, Value); N]) -> Record {
    pairs.into_iter().collect()
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        self.driver
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<RowStream> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((sql.to_string(), params.to_vec()));
        let rows = state.results.pop_front().unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(RowStream::from_records(rows))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((sql.to_string(), params.to_vec()));
        Ok(state.affected.pop_front().unwrap_or(1))
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        Ok(self.state.lock().unwrap().last_id.clone())
    }

    fn quote_string(&self, s: &str) -> String {
        if self.driver == "mysql" {
            format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
        } else {
            crate::dialect::quote_standard_string(s)
        }
    }
}
