use super::Dialect;

/// Renders the statement that persists an entity.
///
/// `values` holds `(column, literal)` pairs whose literals are already quoted.
/// With `merge` set, the statement must update the row that shares the identifier
/// columns instead of failing on the duplicate key.
pub trait UpsertStrategy: Send + Sync {
    fn render(
        &self,
        table: &str,
        id_columns: &[&str],
        values: &[(&str, String)],
        merge: bool,
    ) -> String;

    /// Suffix that makes a fresh insert hand back its generated `id_column`.
    ///
    /// `None` means the driver's last-insert-id must be asked instead.
    fn returning(&self, _id_column: &str) -> Option<String> {
        None
    }
}

fn insert_into(dialect: Dialect, verb: &str, table: &str, values: &[(&str, String)]) -> String {
    let columns = values
        .iter()
        .map(|(c, _)| dialect.quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let literals = values
        .iter()
        .map(|(_, l)| l.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{verb} {} ({columns}) VALUES ({literals})",
        dialect.quote_identifier(table)
    )
}

/// `INSERT … ON DUPLICATE KEY UPDATE c = VALUES(c)`.
#[derive(Debug, Clone, Copy)]
pub struct MySqlUpsert;

impl UpsertStrategy for MySqlUpsert {
    fn render(
        &self,
        table: &str,
        id_columns: &[&str],
        values: &[(&str, String)],
        merge: bool,
    ) -> String {
        let dialect = Dialect::MySql;
        let mut sql = insert_into(dialect, "INSERT INTO", table, values);
        if !merge {
            return sql;
        }
        let updates = values
            .iter()
            .filter(|(c, _)| !id_columns.contains(c))
            .map(|(c, _)| {
                let col = dialect.quote_identifier(c);
                format!("{col} = VALUES({col})")
            })
            .collect::<Vec<_>>();
        if !updates.is_empty() {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&updates.join(", "));
        }
        sql
    }
}

/// `INSERT OR REPLACE` when merging.
#[derive(Debug, Clone, Copy)]
pub struct SqliteUpsert;

impl UpsertStrategy for SqliteUpsert {
    fn render(
        &self,
        table: &str,
        _id_columns: &[&str],
        values: &[(&str, String)],
        merge: bool,
    ) -> String {
        let verb = if merge { "INSERT OR REPLACE INTO" } else { "INSERT INTO" };
        insert_into(Dialect::Sqlite, verb, table, values)
    }
}

/// `INSERT … ON CONFLICT (ids) DO UPDATE SET c = EXCLUDED.c`.
#[derive(Debug, Clone, Copy)]
pub struct PostgresUpsert;

impl UpsertStrategy for PostgresUpsert {
    fn render(
        &self,
        table: &str,
        id_columns: &[&str],
        values: &[(&str, String)],
        merge: bool,
    ) -> String {
        let dialect = Dialect::Postgres;
        let mut sql = insert_into(dialect, "INSERT INTO", table, values);
        if !merge || id_columns.is_empty() {
            return sql;
        }
        let target = id_columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = values
            .iter()
            .filter(|(c, _)| !id_columns.contains(c))
            .map(|(c, _)| {
                let col = dialect.quote_identifier(c);
                format!("{col} = EXCLUDED.{col}")
            })
            .collect::<Vec<_>>();
        sql.push_str(&format!(" ON CONFLICT ({target}) "));
        if updates.is_empty() {
            sql.push_str("DO NOTHING");
        } else {
            sql.push_str("DO UPDATE SET ");
            sql.push_str(&updates.join(", "));
        }
        sql
    }

    fn returning(&self, id_column: &str) -> Option<String> {
        Some(format!(
            " RETURNING {}",
            Dialect::Postgres.quote_identifier(id_column)
        ))
    }
}
