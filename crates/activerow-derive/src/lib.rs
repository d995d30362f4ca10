//! Derive macros for activerow
//!
//! Provides `#[derive(Entity)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod from_row;

/// Derive `Entity` for a struct wrapping a `Record`.
///
/// # Example
///
/// ```ignore
/// use activerow::{Entity, Record};
///
/// #[derive(Debug, Clone, Default, Entity)]
/// #[orm(table = "test_compound", id = "foo_id, bar_id", auto_id = false)]
/// #[orm(fields(name = String, rank = i64))]
/// struct Compound {
///     record: Record,
/// }
///
/// let mut c = Compound::create();
/// c.set_name("first").set_rank(1);
/// assert_eq!(c.rank()?, Some(1));
/// ```
///
/// # Attributes
///
/// Struct level, repeatable:
///
/// - `#[orm(table = "name")]` - Table name (default: lowercased type path); quoted
///   as one identifier, so `"app.users"` names a table containing a dot
/// - `#[orm(id = "a, b")]` - Identifier column(s), in order (default: `id`)
/// - `#[orm(auto_id = false)]` - The database does not generate the identifier
/// - `#[orm(ignore = "created, modified")]` - Columns never written on save
/// - `#[orm(connection = "name")]` - Registry connection to use
/// - `#[orm(fields(col = Type, ...))]` - Generate `col()` / `set_col()` accessors
///
/// Field level:
///
/// - `#[orm(record)]` - The data bag field (implied for a field of type `Record`)
///
/// Every other field is filled with `Default::default()` when an instance is loaded.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` for a struct.
///
/// # Example
///
/// ```ignore
/// use activerow::FromRow;
///
/// #[derive(FromRow)]
/// struct Total {
///     id: i64,
///     #[orm(column = "COUNT(*)")]
///     total: i64,
///     note: Option<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Read the field from a differently named column
/// - `#[orm(skip)]` - Not read from the row; filled with `Default::default()`
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
