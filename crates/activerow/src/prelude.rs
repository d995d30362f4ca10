//! Convenient imports for typical `activerow` usage.
//!
//! ```ignore
//! use activerow::prelude::*;
//! ```

pub use crate::{
    Connection, ConnectionRegistry, DEFAULT_CONNECTION, Database, Dialect, Entity, FromRow, FromValue, Id, OrmConfig,
    OrmError, OrmResult, Query, QueryBuilder, Record, ResultIter, Value,
};
