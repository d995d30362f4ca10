//! Row mapping traits

use crate::entity::Entity;
use crate::error::OrmResult;
use crate::record::Record;

/// Trait for converting a fetched row into a Rust type.
///
/// Implemented for [`Record`] (the generic row), for every [`Entity`], and by
/// `#[derive(FromRow)]` for ad-hoc result shapes.
///
/// # Example
///
/// ```ignore
/// use activerow::FromRow;
///
/// #[derive(FromRow)]
/// struct Total {
///     #[orm(column = "COUNT(*)")]
///     count: i64,
///     name: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: Record) -> OrmResult<Self>;
}

impl FromRow for Record {
    fn from_row(row: Record) -> OrmResult<Self> {
        Ok(row)
    }
}

impl<E: Entity> FromRow for E {
    fn from_row(row: Record) -> OrmResult<Self> {
        Ok(E::from_data(row))
    }
}
