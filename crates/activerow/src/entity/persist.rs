use super::Entity;
use crate::client::Database;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

const EMPTY_DATA: &str = "can not save empty data!";

/// Columns written by a save, in record order.
///
/// Ignored columns are never written. On a fresh insert, generated identifier
/// columns that hold no value are left out so the database fills them.
fn writable_columns<E: Entity>(entity: &E, merge: bool) -> Vec<(&str, Value)> {
    entity
        .record()
        .iter()
        .filter(|(column, _)| !E::IGNORED_COLUMNS.contains(column))
        .filter(|(column, value)| {
            merge || !(E::AUTO_ID && E::ID_COLUMNS.contains(column) && value.is_empty())
        })
        .map(|(column, value)| (column, value.clone()))
        .collect()
}

pub(super) async fn save<E: Entity>(entity: &mut E, db: &Database) -> OrmResult<()> {
    if entity.record().is_empty() {
        return Err(OrmError::WritePrecondition(EMPTY_DATA.to_string()));
    }

    let merge = entity.has_id();
    let generated = {
        let values = writable_columns(entity, merge);
        if values.is_empty() {
            return Err(OrmError::WritePrecondition(EMPTY_DATA.to_string()));
        }
        let table = E::table();
        let generated_id = match E::ID_COLUMNS {
            [column] if E::AUTO_ID => Some(*column),
            _ => None,
        };
        db.upsert(&table, E::ID_COLUMNS, &values, merge, generated_id)
            .await?
    };

    if let ([column], Some(id)) = (E::ID_COLUMNS, generated) {
        entity.set(column, id);
    }
    Ok(())
}

pub(super) async fn delete<E: Entity>(entity: &E, db: &Database) -> OrmResult<bool> {
    let predicates = E::ID_COLUMNS
        .iter()
        .map(|column| {
            format!(
                "{} = {}",
                db.quote_identifier(column),
                db.quote(entity.get(column))
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!(
        "DELETE FROM {} WHERE {predicates}",
        db.quote_identifier(&E::table())
    );
    Ok(db.execute(&sql, &[]).await? > 0)
}
