use super::*;
use crate::mock::{MockConnection, row};

fn mysql_builder(table: &str, ids: &[&str]) -> (QueryBuilder<Record>, MockConnection) {
    let (db, mock) = MockConnection::database("mysql");
    (QueryBuilder::new(db, table, ids), mock)
}

fn sqlite_builder(table: &str) -> (QueryBuilder<Record>, MockConnection) {
    let (db, mock) = MockConnection::database("sqlite");
    (QueryBuilder::new(db, table, &["id"]), mock)
}

fn built(qb: &mut QueryBuilder<Record>) -> String {
    qb.build();
    qb.sql().unwrap_or_default().to_string()
}

#[test]
fn empty_builder_selects_everything() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    assert_eq!(built(&mut qb), "SELECT * FROM `test`");
    assert!(qb.params().is_empty());

    let (mut qb, _) = sqlite_builder("test");
    assert_eq!(built(&mut qb), "SELECT * FROM \"test\"");
}

#[test]
fn select_list_forms() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.select("id", None);
    assert_eq!(built(&mut qb), "SELECT `id` FROM `test`");

    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.distinct().select("id", None);
    assert_eq!(built(&mut qb), "SELECT DISTINCT `id` FROM `test`");

    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.select_all().select("id", None);
    assert_eq!(built(&mut qb), "SELECT *, `id` FROM `test`");

    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.select("id", None).select("deleted", Some("delete"));
    assert_eq!(built(&mut qb), "SELECT `id`, `deleted` AS `delete` FROM `test`");

    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.select_expr("NOW()", Some("today"))
        .select_expr("YEAR(NOW())", None);
    assert_eq!(built(&mut qb), "SELECT NOW() AS `today`, YEAR(NOW()) FROM `test`");
}

#[test]
fn where_predicates_keep_params_in_lock_step() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.where_eq("id", 1);
    assert_eq!(built(&mut qb), "SELECT * FROM `test` WHERE `id` = ?");
    assert_eq!(qb.params(), [Value::Int(1)]);

    qb.where_eq("name", "loremipsum");
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM `test` WHERE `id` = ? AND `name` = ?"
    );
    assert_eq!(qb.params(), [Value::Int(1), Value::from("loremipsum")]);
}

#[test]
fn comparison_operators() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.where_lt("id", 10)
        .where_lte("number", 20)
        .where_gt("id", 0)
        .where_gte("number", 75)
        .where_not("field", 1234);
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM `test` WHERE `id` < ? AND `number` <= ? AND `id` > ? AND `number` >= ? AND `field` != ?"
    );
    assert_eq!(
        qb.params(),
        [10, 20, 0, 75, 1234].map(Value::Int).as_slice()
    );
}

#[test]
fn null_checks_take_no_params() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.where_not_null("modified").where_null("field");
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM `test` WHERE `modified` IS NOT NULL AND `field` IS NULL"
    );
    assert!(qb.params().is_empty());
}

#[test]
fn where_expr_is_verbatim() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.where_expr("id", "10 + 20").where_expr("modified", "NOW()");
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM `test` WHERE `id` = 10 + 20 AND `modified` = NOW()"
    );
    assert!(qb.params().is_empty());
}

#[test]
fn where_raw_extends_params_in_order() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.where_raw("1 < ?", [20])
        .where_raw("`modified` <= NOW()", Vec::<Value>::new())
        .where_raw("SUM(`number`) < ? AND YEAR(NOW()) <= ?", [100, 2010]);
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM `test` WHERE 1 < ? AND `modified` <= NOW() AND SUM(`number`) < ? AND YEAR(NOW()) <= ?"
    );
    assert_eq!(qb.params(), [20, 100, 2010].map(Value::Int).as_slice());
}

#[test]
fn where_in_one_placeholder_per_value() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.where_eq("number", 10)
        .where_in("number", [Value::Int(10), Value::Int(7), Value::Float(80.76)])
        .where_eq("id", 18);
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM `test` WHERE `number` = ? AND `number` IN (?, ?, ?) AND `id` = ?"
    );
    assert_eq!(
        qb.params(),
        [
            Value::Int(10),
            Value::Int(10),
            Value::Int(7),
            Value::Float(80.76),
            Value::Int(18)
        ]
    );
}

#[test]
fn where_in_empty_matches_nothing() {
    let (mut qb, _) = sqlite_builder("test");
    qb.where_in("id", Vec::<i64>::new());
    assert_eq!(built(&mut qb), "SELECT * FROM \"test\" WHERE \"id\" IN (NULL)");
    assert!(qb.params().is_empty());
}

#[test]
fn where_id_single_and_compound() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.where_id([10]).unwrap();
    assert_eq!(built(&mut qb), "SELECT * FROM `test` WHERE `id` = ?");
    assert_eq!(qb.params(), [Value::Int(10)]);

    let (mut qb, _) = mysql_builder("test", &["foo_id", "bar_id"]);
    qb.where_id([5, 75]).unwrap();
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM `test` WHERE `foo_id` = ? AND `bar_id` = ?"
    );
    assert_eq!(qb.params(), [Value::Int(5), Value::Int(75)]);
}

#[test]
fn where_id_count_mismatch_is_usage_error() {
    let (mut qb, _) = mysql_builder("test", &["foo_id", "bar_id"]);
    assert!(qb.where_id([1]).unwrap_err().is_usage());
    assert!(qb.where_id([1, 2, 3]).unwrap_err().is_usage());
    assert_eq!(built(&mut qb), "SELECT * FROM `test`");
}

#[test]
fn ordering() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.order_by_desc("id").order_by_asc("modified");
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM `test` ORDER BY `id` DESC, `modified` ASC"
    );
}

#[test]
fn order_by_expr_params_follow_where_params() {
    let (mut qb, _) = sqlite_builder("test");
    qb.order_by_expr("ABS(\"number\" - ?)", [50]).where_eq("active", true);
    assert_eq!(
        built(&mut qb),
        "SELECT * FROM \"test\" WHERE \"active\" = ? ORDER BY ABS(\"number\" - ?)"
    );
    assert_eq!(qb.params(), [Value::Bool(true), Value::Int(50)]);
}

#[test]
fn debug_shows_ordering_and_distinct_state() {
    let (mut qb, _) = mysql_builder("test", &["foo_id", "bar_id"]);
    qb.distinct()
        .where_eq("a", 1)
        .order_by_expr("FIELD(`b`, ?, ?)", ["x", "y"]);
    let debug = format!("{qb:?}");
    assert!(debug.contains("distinct: true"));
    assert!(debug.contains(r#"id_columns: ["foo_id", "bar_id"]"#));
    assert!(debug.contains(r#"order_params: [Text("x"), Text("y")]"#));
}

#[test]
fn limit_and_offset() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.offset(200);
    assert_eq!(built(&mut qb), "SELECT * FROM `test`");
    qb.limit(100);
    assert_eq!(built(&mut qb), "SELECT * FROM `test` LIMIT 100 OFFSET 200");

    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.limit(100);
    assert_eq!(built(&mut qb), "SELECT * FROM `test` LIMIT 100");
    qb.offset(200);
    assert_eq!(built(&mut qb), "SELECT * FROM `test` LIMIT 100 OFFSET 200");
}

#[test]
fn build_is_idempotent() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.where_eq("id", 1).order_by_asc("id").limit(5);
    let first = built(&mut qb);
    let params = qb.params().to_vec();
    assert_eq!(built(&mut qb), first);
    assert_eq!(qb.params(), params.as_slice());
}

#[test]
fn build_keeps_params_without_predicates() {
    let (mut qb, _) = mysql_builder("test", &["id"]);
    qb.set_params([Value::Int(9)]);
    qb.build();
    assert_eq!(qb.params(), [Value::Int(9)]);
}

#[tokio::test]
async fn find_one_forces_limit_temporarily() {
    let (mut qb, mock) = mysql_builder("test", &["id"]);
    mock.push_rows(vec![row([("id", Value::Int(3))])]);
    qb.where_eq("id", 3).limit(50);

    let found = qb.find_one().await.unwrap().unwrap();
    assert_eq!(found.get("id"), &Value::Int(3));
    assert_eq!(
        mock.last_sql(),
        "SELECT * FROM `test` WHERE `id` = ? LIMIT 1"
    );

    qb.find_all().await.unwrap();
    assert_eq!(
        mock.last_sql(),
        "SELECT * FROM `test` WHERE `id` = ? LIMIT 50"
    );
}

#[tokio::test]
async fn find_one_without_rows_is_none() {
    let (mut qb, _) = sqlite_builder("test");
    assert!(qb.find_one().await.unwrap().is_none());
}

#[tokio::test]
async fn find_column_returns_first_column_of_first_row() {
    let (mut qb, mock) = sqlite_builder("test");
    mock.push_rows(vec![
        row([("name", Value::from("a")), ("id", Value::Int(1))]),
        row([("name", Value::from("b")), ("id", Value::Int(2))]),
    ]);
    qb.select("name", None);
    assert_eq!(qb.find_column().await.unwrap(), Some(Value::from("a")));
    assert_eq!(mock.last_sql(), "SELECT \"name\" FROM \"test\" LIMIT 1");

    // no rows
    assert_eq!(qb.find_column().await.unwrap(), None);
}

#[tokio::test]
async fn count_swaps_select_and_restores_state() {
    let (mut qb, mock) = mysql_builder("test", &["id"]);
    mock.push_rows(vec![row([("COUNT(*)", Value::Int(2))])]);
    mock.push_rows(vec![
        row([("id", Value::Int(1)), ("name", "a".into())]),
        row([("id", Value::Int(2)), ("name", "b".into())]),
    ]);
    qb.select("id", None)
        .select("name", None)
        .where_gt("id", 0)
        .order_by_asc("id")
        .limit(10)
        .offset(0);

    assert_eq!(qb.count().await.unwrap(), 2);
    let (count_sql, count_params) = mock.statements()[0].clone();
    assert_eq!(count_sql, "SELECT COUNT(*) FROM `test` WHERE `id` > ?");
    assert_eq!(count_params, [Value::Int(0)]);

    let rows = qb.find_all().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].columns().collect::<Vec<_>>(), ["id", "name"]);
    assert_eq!(
        mock.last_sql(),
        "SELECT `id`, `name` FROM `test` WHERE `id` > ? ORDER BY `id` ASC LIMIT 10 OFFSET 0"
    );
}

#[tokio::test]
async fn count_accepts_textual_integers() {
    let (mut qb, mock) = mysql_builder("test", &["id"]);
    mock.push_rows(vec![row([("COUNT(*)", Value::from("17"))])]);
    assert_eq!(qb.count().await.unwrap(), 17);
}

#[tokio::test]
async fn count_drops_stale_order_params() {
    let (mut qb, mock) = sqlite_builder("test");
    qb.order_by_expr("ABS(\"n\" - ?)", [3]);
    qb.find_all().await.unwrap();
    assert_eq!(mock.statements()[0].1, [Value::Int(3)]);

    mock.push_rows(vec![row([("COUNT(*)", Value::Int(0))])]);
    assert_eq!(qb.count().await.unwrap(), 0);
    assert!(mock.statements()[1].1.is_empty());
}

#[tokio::test]
async fn builder_state_mutable_after_terminal_call() {
    let (mut qb, mock) = sqlite_builder("test");
    qb.find_all().await.unwrap();
    qb.where_eq("id", 1);
    qb.find_all().await.unwrap();
    assert_eq!(mock.last_sql(), "SELECT * FROM \"test\" WHERE \"id\" = ?");
}

#[tokio::test]
async fn raw_query_binds_params() {
    let (db, mock) = MockConnection::database("pgsql");
    mock.push_rows(vec![row([("n", Value::Int(1))])]);
    let mut q: Query<Record> = Query::with_sql(db, "SELECT n FROM t WHERE a = ? AND b = ?");
    q.bind(1).bind("x");
    let rows = q.find_all().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        mock.statements()[0].1,
        [Value::Int(1), Value::from("x")]
    );
}

#[tokio::test]
async fn query_without_sql_is_usage_error() {
    let (db, _) = MockConnection::database("sqlite");
    let mut q: Query<Record> = Query::new(db);
    assert!(q.execute().await.unwrap_err().is_usage());
}

#[tokio::test]
async fn fetch_before_execute_is_usage_error() {
    let (db, _) = MockConnection::database("sqlite");
    let mut q: Query<Record> = Query::with_sql(db, "SELECT 1");
    assert!(q.fetch().await.unwrap_err().is_usage());
}

#[tokio::test]
async fn fetch_walks_rows_then_none() {
    let (db, mock) = MockConnection::database("sqlite");
    mock.push_rows(vec![row([("a", Value::Int(1))]), row([("a", Value::Int(2))])]);
    let mut q: Query<Record> = Query::with_sql(db, "SELECT a FROM t");
    q.execute().await.unwrap();
    assert_eq!(q.fetch().await.unwrap().unwrap().get("a"), &Value::Int(1));
    assert_eq!(q.fetch().await.unwrap().unwrap().get("a"), &Value::Int(2));
    assert!(q.fetch().await.unwrap().is_none());
}

#[tokio::test]
async fn raw_query_count_drains_rows() {
    let (db, mock) = MockConnection::database("sqlite");
    mock.push_rows(vec![row([("a", Value::Int(1))]); 3]);
    let mut q: Query<Record> = Query::with_sql(db, "SELECT a FROM t");
    assert_eq!(q.count().await.unwrap(), 3);
}

#[tokio::test]
async fn driver_errors_propagate_unchanged() {
    let (db, mock) = MockConnection::database("mysql");
    mock.push_error("You have an error in your SQL syntax");
    let mut q: Query<Record> = Query::with_sql(db, "SELEC 1");
    let err = q.find_one().await.unwrap_err();
    assert!(err.is_driver());
    assert_eq!(err.code().as_deref(), Some("42000"));
}

#[tokio::test]
async fn result_iter_is_single_pass() {
    let (db, mock) = MockConnection::database("sqlite");
    mock.push_rows(vec![row([("a", Value::Int(1))]), row([("a", Value::Int(2))])]);
    let mut q: Query<Record> = Query::with_sql(db, "SELECT a FROM t");
    let mut iter = q.find_many().await.unwrap();

    iter.rewind().unwrap();
    assert!(!iter.is_used());
    let first = iter.try_next().await.unwrap().unwrap();
    assert_eq!(first.get("a"), &Value::Int(1));

    let err = iter.rewind().unwrap_err();
    assert!(err.is_usage());
    assert!(err.to_string().contains("Cannot traverse an already closed query"));

    // a second full traversal is refused, the cursor is not re-executed
    assert!(iter.collect_all().await.unwrap_err().is_usage());
    assert_eq!(mock.statements().len(), 1);
}

#[tokio::test]
async fn result_iter_as_stream() {
    use futures_util::TryStreamExt;

    let (db, mock) = MockConnection::database("sqlite");
    mock.push_rows(vec![row([("a", Value::Int(1))]), row([("a", Value::Int(2))])]);
    let mut q: Query<Record> = Query::with_sql(db, "SELECT a FROM t");
    let mut iter = q.find_many().await.unwrap();
    let rows: Vec<Record> = (&mut iter).try_collect().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(iter.rewind().is_err());
}
