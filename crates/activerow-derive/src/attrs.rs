//! `#[orm(...)]` attribute parsing.

use std::collections::HashSet;
use syn::ext::IdentExt;
use syn::{Attribute, Error, Field, Ident, LitBool, LitStr, Result, Type};

/// A typed accessor requested with `fields(name = Type)`.
pub(crate) struct Accessor {
    pub name: Ident,
    pub ty: Type,
}

/// Struct-level entity metadata, merged across every `#[orm(...)]` on the type.
#[derive(Default)]
pub(crate) struct EntityAttrs {
    pub table: Option<String>,
    pub id_columns: Option<Vec<String>>,
    pub auto_id: Option<bool>,
    pub ignored: Vec<String>,
    pub connection: Option<String>,
    pub accessors: Vec<Accessor>,
}

impl EntityAttrs {
    pub(crate) fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.table = Some(table_name(&lit)?);
                } else if meta.path.is_ident("id") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.id_columns = Some(column_list(&lit, "id", false)?);
                } else if meta.path.is_ident("auto_id") {
                    let lit: LitBool = meta.value()?.parse()?;
                    out.auto_id = Some(lit.value);
                } else if meta.path.is_ident("ignore") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.ignored.extend(column_list(&lit, "ignore", true)?);
                } else if meta.path.is_ident("connection") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.connection = Some(lit.value());
                } else if meta.path.is_ident("fields") {
                    meta.parse_nested_meta(|field| {
                        let name = field
                            .path
                            .get_ident()
                            .cloned()
                            .ok_or_else(|| field.error("expected a column name"))?;
                        let ty: Type = field.value()?.parse()?;
                        out.accessors.push(Accessor { name, ty });
                        Ok(())
                    })?;
                } else {
                    return Err(meta.error(
                        "unknown entity attribute (expected table, id, auto_id, ignore, connection or fields)",
                    ));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

/// A table name. Any non-blank text is accepted; the runtime quotes it as a single identifier.
fn table_name(lit: &LitStr) -> Result<String> {
    let name = lit.value();
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::new(lit.span(), "table must not be empty"));
    }
    Ok(name.to_string())
}

/// Parse `"a, b, c"` into column names, rejecting blank entries and repeats.
fn column_list(lit: &LitStr, what: &str, allow_empty: bool) -> Result<Vec<String>> {
    let raw = lit.value();
    if raw.trim().is_empty() {
        if allow_empty {
            return Ok(Vec::new());
        }
        return Err(Error::new(
            lit.span(),
            format!("{what} must name at least one column"),
        ));
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for column in raw.split(',').map(str::trim) {
        if column.is_empty() {
            return Err(Error::new(
                lit.span(),
                format!("{what} has an empty entry in \"{raw}\""),
            ));
        }
        if !seen.insert(column) {
            return Err(Error::new(
                lit.span(),
                format!("{what} lists column '{column}' twice"),
            ));
        }
        columns.push(column.to_string());
    }
    Ok(columns)
}

/// Field-level options.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub record: bool,
    pub column: Option<String>,
    pub skip: bool,
}

impl FieldAttrs {
    pub(crate) fn parse(field: &Field) -> Result<Self> {
        let mut out = Self::default();
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("orm")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("record") {
                    out.record = true;
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                } else if meta.path.is_ident("column") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.column = Some(lit.value());
                } else {
                    return Err(meta.error("unknown field attribute (expected record, column or skip)"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

/// Column name for a field: the explicit `column`, else the field name without `r#`.
pub(crate) fn column_name(field: &Field, attrs: &FieldAttrs) -> String {
    attrs.column.clone().unwrap_or_else(|| {
        field
            .ident
            .as_ref()
            .map(|i| i.unraw().to_string())
            .unwrap_or_default()
    })
}

/// Whether `ty` names the `Record` type (by its last path segment).
pub(crate) fn is_record_type(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    type_path
        .path
        .segments
        .last()
        .is_some_and(|seg| seg.ident == "Record" && seg.arguments.is_empty())
}
