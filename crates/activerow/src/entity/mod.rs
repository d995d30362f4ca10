//! Active-record entities.
//!
//! An entity is a typed wrapper around a [`Record`] plus static metadata: table,
//! identifier column(s), whether the identifier is generated by the database,
//! columns never written, and the connection to use. `#[derive(Entity)]`
//! generates the impl; the trait can also be implemented by hand.
//!
//! ```ignore
//! #[derive(Debug, Clone, Default, Entity)]
//! #[orm(table = "test_basic", ignore = "modified", fields(name = String, number = f64))]
//! pub struct Basic {
//!     record: Record,
//! }
//!
//! let mut basic = Basic::create();
//! basic.set_name("Alice".to_string()).set_number(10.5);
//! basic.save(&registry).await?;
//! let again = Basic::find(&registry, [basic.get("id").clone()]).await?;
//! ```

mod persist;

use crate::client::Database;
use crate::error::OrmResult;
use crate::query::{Query, QueryBuilder};
use crate::record::Record;
use crate::registry::ConnectionRegistry;
use crate::value::Value;
use std::future::Future;

/// Identifier of an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Id {
    /// The value of the single identifier column.
    Single(Value),
    /// Column/value pairs in declared order.
    Composite(Vec<(String, Value)>),
}

impl Id {
    /// Values in declared column order.
    pub fn values(&self) -> Vec<Value> {
        match self {
            Id::Single(v) => vec![v.clone()],
            Id::Composite(pairs) => pairs.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    /// `true` when every component is non-empty (see [`Value::is_empty`]).
    pub fn is_present(&self) -> bool {
        match self {
            Id::Single(v) => !v.is_empty(),
            Id::Composite(pairs) => pairs.iter().all(|(_, v)| !v.is_empty()),
        }
    }
}

/// Table name derived from a Rust type path: lowercased, `::` replaced by `_`.
///
/// `app::model::Compound` becomes `app_model_compound`.
pub fn default_table_name<T: ?Sized>() -> String {
    let path = std::any::type_name::<T>();
    let path = path.split('<').next().unwrap_or(path);
    path.replace("::", "_").to_lowercase()
}

/// A persisted row with typed metadata.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Identifier columns, in order. More than one means a composite key.
    const ID_COLUMNS: &'static [&'static str] = &["id"];
    /// Whether the database generates the identifier on insert.
    const AUTO_ID: bool = true;
    /// Columns skipped on write (e.g. server-maintained timestamps).
    const IGNORED_COLUMNS: &'static [&'static str] = &[];
    /// Registry name of the connection; `None` uses the registry default.
    const CONNECTION: Option<&'static str> = None;

    fn table() -> String {
        default_table_name::<Self>()
    }

    /// Build an instance around `data`.
    fn from_data(data: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// An empty instance.
    fn create() -> Self {
        Self::from_data(Record::new())
    }

    fn get(&self, name: &str) -> &Value {
        self.record().get(name)
    }

    fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.record_mut().set(name, value);
        self
    }

    fn has(&self, name: &str) -> bool {
        self.record().has(name)
    }

    fn remove(&mut self, name: &str) -> &mut Self {
        self.record_mut().remove(name);
        self
    }

    fn data(&self) -> &Record {
        self.record()
    }

    /// Replace the whole data bag.
    fn set_data(&mut self, data: Record) -> &mut Self {
        *self.record_mut() = data;
        self
    }

    fn copy_data_from<I, K, V>(&mut self, data: I, except: &[&str]) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.record_mut().copy_data_from(data, except);
        self
    }

    fn to_json(&self) -> serde_json::Value {
        self.record().to_json()
    }

    fn id(&self) -> Id {
        match Self::ID_COLUMNS {
            [single] => Id::Single(self.get(single).clone()),
            columns => Id::Composite(
                columns
                    .iter()
                    .map(|c| (c.to_string(), self.get(c).clone()))
                    .collect(),
            ),
        }
    }

    /// Whether every identifier column holds a non-empty value.
    ///
    /// `0`, `""`, `"0"`, `false` and null all count as absent.
    fn has_id(&self) -> bool {
        self.id().is_present()
    }

    /// The connection this entity reads and writes through.
    fn database(registry: &ConnectionRegistry) -> OrmResult<Database> {
        match Self::CONNECTION {
            Some(name) => registry.connection(name),
            None => registry.default_connection(),
        }
    }

    /// A builder over this entity's table.
    fn query(registry: &ConnectionRegistry) -> OrmResult<QueryBuilder<Self>> {
        Ok(Self::query_on(Self::database(registry)?))
    }

    fn query_on(db: Database) -> QueryBuilder<Self> {
        QueryBuilder::new(db, Self::table(), Self::ID_COLUMNS)
    }

    /// Raw SQL materialized as this entity.
    fn custom_query<I, V>(
        registry: &ConnectionRegistry,
        sql: &str,
        params: I,
    ) -> OrmResult<Query<Self>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut query = Query::with_sql(Self::database(registry)?, sql);
        query.set_params(params);
        Ok(query)
    }

    /// Load by identifier; one value per identifier column.
    fn find<I, V>(
        registry: &ConnectionRegistry,
        ids: I,
    ) -> impl Future<Output = OrmResult<Option<Self>>> + Send
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids = ids.into_iter().map(Into::into).collect::<Vec<Value>>();
        let builder = Self::query(registry);
        async move {
            let mut builder = builder?;
            builder.where_id(ids)?;
            builder.find_one().await
        }
    }

    /// Every row of the table.
    fn find_all(registry: &ConnectionRegistry) -> impl Future<Output = OrmResult<Vec<Self>>> + Send {
        let builder = Self::query(registry);
        async move {
            let mut builder = builder?;
            builder.find_all().await
        }
    }

    /// Insert, or merge into the existing row when the identifier is set.
    ///
    /// For a fresh insert of a single-column generated identifier, the new id is
    /// written back into the record.
    fn save(&mut self, registry: &ConnectionRegistry) -> impl Future<Output = OrmResult<()>> + Send {
        let db = Self::database(registry);
        async move {
            let db = db?;
            persist::save(self, &db).await
        }
    }

    fn save_on<'a>(&'a mut self, db: &'a Database) -> impl Future<Output = OrmResult<()>> + Send + 'a {
        persist::save(self, db)
    }

    /// Delete the row matching this entity's identifier. Returns whether a row was removed.
    fn delete(&self, registry: &ConnectionRegistry) -> impl Future<Output = OrmResult<bool>> + Send {
        let db = Self::database(registry);
        async move {
            let db = db?;
            persist::delete(self, &db).await
        }
    }

    fn delete_on<'a>(&'a self, db: &'a Database) -> impl Future<Output = OrmResult<bool>> + Send + 'a {
        persist::delete(self, db)
    }
}
