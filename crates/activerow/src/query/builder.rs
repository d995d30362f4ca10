use super::{Query, ResultIter};
use crate::client::Database;
use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use crate::row::FromRow;
use crate::value::Value;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Incrementally assembled `SELECT` over one table.
///
/// Builder methods take `&mut self` and may be called in any order, before or
/// after a terminal call; every terminal call (`find_one`, `find_many`,
/// `find_all`, `find_column`, `count`) runs [`build`](Self::build) first.
/// Value-bearing predicates append one `?` and one parameter in lock-step.
///
/// # Example
///
/// ```ignore
/// let mut qb = QueryBuilder::<Record>::new(db, "users", &["id"]);
/// qb.where_eq("status", "active").where_gt("age", 18).order_by_desc("created_at").limit(10);
/// let users = qb.find_all().await?;
/// let total = qb.count().await?;
/// ```
#[must_use]
pub struct QueryBuilder<T = Record> {
    query: Query<T>,
    table: String,
    id_columns: Vec<String>,
    select: Vec<String>,
    distinct: bool,
    wheres: Vec<String>,
    where_params: Vec<Value>,
    order: Vec<String>,
    order_params: Vec<Value>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl<T> fmt::Debug for QueryBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.table)
            .field("id_columns", &self.id_columns)
            .field("select", &self.select)
            .field("distinct", &self.distinct)
            .field("wheres", &self.wheres)
            .field("where_params", &self.where_params)
            .field("order", &self.order)
            .field("order_params", &self.order_params)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T> Deref for QueryBuilder<T> {
    type Target = Query<T>;

    fn deref(&self) -> &Query<T> {
        &self.query
    }
}

impl<T> DerefMut for QueryBuilder<T> {
    fn deref_mut(&mut self) -> &mut Query<T> {
        &mut self.query
    }
}

impl<T: FromRow> QueryBuilder<T> {
    /// A builder over `table` whose identifier is `id_columns` (in declared order).
    pub fn new(db: Database, table: impl Into<String>, id_columns: &[&str]) -> Self {
        Self {
            query: Query::new(db),
            table: table.into(),
            id_columns: id_columns.iter().map(|c| c.to_string()).collect(),
            select: Vec::new(),
            distinct: false,
            wheres: Vec::new(),
            where_params: Vec::new(),
            order: Vec::new(),
            order_params: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_columns(&self) -> &[String] {
        &self.id_columns
    }

    pub fn quote_identifier(&self, identifier: &str) -> String {
        self.query.database().quote_identifier(identifier)
    }

    fn with_alias(&self, expr: String, alias: Option<&str>) -> String {
        match alias {
            Some(alias) => format!("{expr} AS {}", self.quote_identifier(alias)),
            None => expr,
        }
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    /// Add `*` to the select list. Repeatable.
    pub fn select_all(&mut self) -> &mut Self {
        self.select.push("*".to_string());
        self
    }

    /// Add a quoted column, optionally aliased.
    pub fn select(&mut self, column: &str, alias: Option<&str>) -> &mut Self {
        let expr = self.with_alias(self.quote_identifier(column), alias);
        self.select.push(expr);
        self
    }

    /// Add a raw expression (not quoted), optionally aliased.
    pub fn select_expr(&mut self, expression: &str, alias: Option<&str>) -> &mut Self {
        let expr = self.with_alias(expression.to_string(), alias);
        self.select.push(expr);
        self
    }

    fn push_comparison(&mut self, column: &str, op: &str, value: Value) -> &mut Self {
        let predicate = format!("{} {op} ?", self.quote_identifier(column));
        self.wheres.push(predicate);
        self.where_params.push(value);
        self
    }

    /// `column = ?`
    pub fn where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_comparison(column, "=", value.into())
    }

    /// `column != ?`
    pub fn where_not(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_comparison(column, "!=", value.into())
    }

    pub fn where_lt(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_comparison(column, "<", value.into())
    }

    pub fn where_lte(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_comparison(column, "<=", value.into())
    }

    pub fn where_gt(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_comparison(column, ">", value.into())
    }

    pub fn where_gte(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_comparison(column, ">=", value.into())
    }

    pub fn where_null(&mut self, column: &str) -> &mut Self {
        let predicate = format!("{} IS NULL", self.quote_identifier(column));
        self.wheres.push(predicate);
        self
    }

    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        let predicate = format!("{} IS NOT NULL", self.quote_identifier(column));
        self.wheres.push(predicate);
        self
    }

    /// `column IN (?, ?, …)`. An empty list renders `IN (NULL)`, which matches no row.
    pub fn where_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        let placeholders = if values.is_empty() {
            "NULL".to_string()
        } else {
            vec!["?"; values.len()].join(", ")
        };
        let predicate = format!("{} IN ({placeholders})", self.quote_identifier(column));
        self.wheres.push(predicate);
        self.where_params.extend(values);
        self
    }

    /// `column = <expression>`, the expression inserted verbatim.
    pub fn where_expr(&mut self, column: &str, expression: &str) -> &mut Self {
        let predicate = format!("{} = {expression}", self.quote_identifier(column));
        self.wheres.push(predicate);
        self
    }

    /// A verbatim predicate with its own `?` parameters.
    pub fn where_raw<I, V>(&mut self, fragment: &str, params: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.wheres.push(fragment.to_string());
        self.where_params.extend(params.into_iter().map(Into::into));
        self
    }

    /// One equality predicate per identifier column, in declared order.
    ///
    /// Fails with [`OrmError::Usage`] when the number of values differs from the
    /// number of identifier columns; the builder is left untouched in that case.
    pub fn where_id<I, V>(&mut self, ids: I) -> OrmResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids = ids.into_iter().map(Into::into).collect::<Vec<_>>();
        if ids.len() != self.id_columns.len() {
            return Err(OrmError::usage(format!(
                "number of id parameters must match the number of id columns (expected {}, got {})",
                self.id_columns.len(),
                ids.len()
            )));
        }
        let columns = self.id_columns.clone();
        for (column, value) in columns.iter().zip(ids) {
            self.push_comparison(column, "=", value);
        }
        Ok(self)
    }

    pub fn order_by_asc(&mut self, column: &str) -> &mut Self {
        let fragment = format!("{} ASC", self.quote_identifier(column));
        self.order.push(fragment);
        self
    }

    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        let fragment = format!("{} DESC", self.quote_identifier(column));
        self.order.push(fragment);
        self
    }

    /// A verbatim ORDER BY fragment with its own `?` parameters.
    pub fn order_by_expr<I, V>(&mut self, expression: &str, params: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.order.push(expression.to_string());
        self.order_params.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Only rendered when a limit is also set.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Serialize the builder state into the underlying query's SQL and parameters.
    ///
    /// Idempotent. Parameters are replaced only when the statement carries
    /// predicates or ORDER BY parameters; otherwise the query keeps its list.
    pub fn build(&mut self) -> &mut Self {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.select.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.quote_identifier(&self.table));
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.join(" AND "));
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        self.query.set_query(sql);
        if !self.wheres.is_empty() || !self.order_params.is_empty() {
            let params = self
                .where_params
                .iter()
                .chain(&self.order_params)
                .cloned()
                .collect::<Vec<_>>();
            self.query.set_params(params);
        }
        self
    }

    /// Build with `LIMIT 1` in place, then restore the caller's limit.
    fn build_single(&mut self) {
        let limit = self.limit.replace(1);
        self.build();
        self.limit = limit;
    }

    pub async fn find_column(&mut self) -> OrmResult<Option<Value>> {
        self.build_single();
        self.query.find_column().await
    }

    pub async fn find_one(&mut self) -> OrmResult<Option<T>> {
        self.build_single();
        self.query.find_one().await
    }

    pub async fn find_many(&mut self) -> OrmResult<ResultIter<T>> {
        self.build();
        self.query.find_many().await
    }

    pub async fn find_all(&mut self) -> OrmResult<Vec<T>> {
        self.build();
        self.query.find_all().await
    }

    /// Server-side `COUNT(*)` restricted by the current predicates.
    ///
    /// Select list, ordering and pagination are swapped out for the count and
    /// restored afterwards, so the builder can be reused for fetching.
    pub async fn count(&mut self) -> OrmResult<u64> {
        let select = std::mem::replace(&mut self.select, vec!["COUNT(*)".to_string()]);
        let distinct = std::mem::take(&mut self.distinct);
        let order = std::mem::take(&mut self.order);
        let order_params = std::mem::take(&mut self.order_params);
        let limit = self.limit.take();
        let offset = self.offset.take();

        self.build();
        if self.wheres.is_empty() && !order_params.is_empty() {
            // ORDER BY parameters from an earlier build are not part of this statement
            self.query.set_params(Vec::<Value>::new());
        }
        let result = self.query.find_column().await;

        self.select = select;
        self.distinct = distinct;
        self.order = order;
        self.order_params = order_params;
        self.limit = limit;
        self.offset = offset;

        match result? {
            Some(value) => value.as_i64().map(|n| n.max(0) as u64).ok_or_else(|| {
                OrmError::decode("COUNT(*)", format!("expected integer, got {}", value.kind()))
            }),
            None => Ok(0),
        }
    }
}
