//! # activerow
//!
//! A lightweight active-record ORM with a fluent query builder, speaking MySQL,
//! SQLite and PostgreSQL.
//!
//! ## Features
//!
//! - **Active records**: entities wrap an ordered column map and know their table,
//!   identifier column(s), generated-id flag, ignored columns and connection
//! - **Query builder**: parameterized `SELECT` assembly with dialect-aware quoting
//! - **Raw SQL**: `Query` runs any statement with `?` parameters and materializes
//!   rows as records, entities or `#[derive(FromRow)]` structs
//! - **Single-pass results**: `find_many` streams rows, `find_all` collects them
//! - **Per-dialect upsert**: `ON DUPLICATE KEY UPDATE`, `INSERT OR REPLACE`, `ON CONFLICT`
//! - **Statement logging**: `tracing` events on the `activerow.sql` target
//!
//! ## Example
//!
//! ```ignore
//! use activerow::prelude::*;
//! use activerow::backend::sqlite::SqliteConnection;
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[orm(table = "users", fields(name = String))]
//! struct User {
//!     record: Record,
//! }
//!
//! let registry = ConnectionRegistry::new();
//! registry.set_connection("default", SqliteConnection::open("app.db")?)?;
//!
//! let mut user = User::create();
//! user.set_name("alice".to_string());
//! user.save(&registry).await?;
//!
//! let mut qb = User::query(&registry)?;
//! qb.where_eq("name", "alice").order_by_desc("id");
//! let users = qb.find_all().await?;
//! let total = qb.count().await?;
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod monitor;
pub mod prelude;
pub mod query;
pub mod record;
pub mod registry;
pub mod row;
pub mod value;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{Connection, Database, RowStream};
pub use config::{DEFAULT_CONNECTION, OrmConfig};
pub use dialect::{Dialect, UpsertStrategy};
pub use entity::{Entity, Id, default_table_name};
pub use error::{OrmError, OrmResult};
pub use query::{Query, QueryBuilder, ResultIter};
pub use record::Record;
pub use registry::ConnectionRegistry;
pub use row::FromRow;
pub use value::{FromValue, Value};

#[cfg(feature = "derive")]
pub use activerow_derive::{Entity, FromRow};
