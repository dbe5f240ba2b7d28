//! End-to-end template compilation across dialects.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{TimeZone, Utc};
use serde_json::json;
use sqltag_template::{
    Arg, Dialect, IdentifierObject, Mssql, MySql, Postgres, Sql, Sqlite, TemplateError, Value,
    default_marker, identifier, raw, row, sql, values,
};

fn bulk_insert() -> Sql {
    let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    sql!(
        "insert into {} ({}) values {} returning id",
        identifier(IdentifierObject::new().schema("app").table("events")),
        identifier(["kind", "payload", "active", "created_at"]),
        values(vec![
            row!["login", json!({"ip": "10.0.0.1"}), true, created],
            row!["logout", Value::Null, false, raw("now()").unwrap()],
        ]),
    )
    .unwrap()
}

#[test]
fn test_bulk_insert_postgres() {
    let compiled = bulk_insert().to_sql(&Postgres).unwrap();

    let expected = concat!(
        r#"insert into "app"."events" ("kind", "payload", "active", "created_at") "#,
        "values ($1, $2, $3, $4), ($5, $6, $7, now()) returning id"
    );
    assert_eq!(compiled.query, expected);
    assert_eq!(compiled.params.len(), 7);
    assert_eq!(compiled.params[1], Value::Json(json!({"ip": "10.0.0.1"})));
}

#[test]
fn test_bulk_insert_sqlite() {
    let compiled = bulk_insert().to_sql(&Sqlite).unwrap();

    let expected = concat!(
        r#"insert into "app"."events" ("kind", "payload", "active", "created_at") "#,
        "values (?, ?, ?, ?), (?, ?, ?, now()) returning id"
    );
    assert_eq!(compiled.query, expected);
    assert_eq!(
        compiled.params,
        vec![
            Value::Text("login".into()),
            Value::Text(r#"{"ip":"10.0.0.1"}"#.into()),
            Value::Int(1),
            Value::Text("2024-01-02T03:04:05Z".into()),
            Value::Text("logout".into()),
            Value::Null,
            Value::Int(0),
        ]
    );
}

#[test]
fn test_bulk_insert_mysql_and_mssql() {
    let mysql = bulk_insert().to_sql(&MySql).unwrap();
    assert!(mysql.query.starts_with("insert into `app`.`events`"));
    assert_eq!(mysql.params[1], Value::Text(r#"{"ip":"10.0.0.1"}"#.into()));
    assert_eq!(mysql.params[2], Value::Bool(true));

    let mssql = bulk_insert().to_sql(&Mssql).unwrap();
    assert!(mssql.query.contains("(@p1, @p2, @p3, @p4), (@p5"));
    assert!(mssql.query.ends_with("@p7, now()) returning id"));
}

#[test]
fn test_dynamic_where_clause() {
    let filters = json!({"name": "ann", "age": 30});

    let mut conditions = Vec::new();
    for key in ["name", "age"] {
        let value = Arg::from_lookup(filters.get(key));
        conditions.push(sql!("{} = {}", identifier(key), value).unwrap());
    }

    let mut query = sql!("select * from {} where ", identifier("people")).unwrap();
    query.append(Sql::join(conditions, " and "));
    query.append(sql!(" limit {}", 10).unwrap());

    let compiled = query.to_sql(&Postgres).unwrap();
    assert_eq!(
        compiled.query,
        r#"select * from "people" where "name" = $1 and "age" = $2 limit $3"#
    );
    assert_eq!(
        compiled.params,
        vec![Value::Text("ann".into()), Value::Int(30), Value::Int(10)]
    );

    let email = Arg::from_lookup(filters.get("email"));
    let missing = sql!("{} = {}", identifier("email"), email);
    assert_eq!(missing, Err(TemplateError::UndefinedParameter));
}

#[test]
fn test_dynamic_identifier_objects() {
    let columns = json!([{"table": "u", "column": "id", "as": "user_id"}, "name"]);
    let query = sql!("select {} from users u", identifier(columns)).unwrap();

    assert_eq!(
        query.to_sql(&Mssql).unwrap().query,
        "select [u].[id] as [user_id], [name] from users u"
    );

    let column = json!({"table": "u", "column": null});
    let invalid = sql!("select {}", identifier(column)).unwrap();
    assert_eq!(
        invalid.to_sql(&Postgres),
        Err(TemplateError::IdentifierUndefinedField { field: "column" })
    );
}

#[test]
fn test_default_marker_outside_values() {
    let query = sql!("update t set a = {} where id = {}", default_marker(), 3).unwrap();
    let compiled = query.to_sql(&Postgres).unwrap();
    assert_eq!(compiled.query, "update t set a = default where id = $1");
}

/// A dialect that inlines integers instead of binding them.
#[derive(Debug)]
struct InlineInts;

impl Dialect for InlineInts {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn escape_param(&self, index: usize) -> String {
        format!(":{index}")
    }

    fn escape_identifier(&self, name: &str) -> String {
        name.to_owned()
    }

    fn value_to_sql(&self, value: &Value, params: &mut Vec<Value>) -> String {
        match value {
            Value::Int(i) => i.to_string(),
            other => {
                params.push(other.clone());
                self.escape_param(params.len())
            }
        }
    }
}

#[test]
fn test_custom_dialect_can_inline_values() {
    let rows = values(vec![row![1, "a"], row![2, "b"]]);
    let query = sql!("insert into t values {}", rows).unwrap();
    let compiled = query.to_sql(&InlineInts).unwrap();

    assert_eq!(compiled.query, "insert into t values (1, :1), (2, :2)");
    assert_eq!(compiled.params, vec![Value::from("a"), Value::from("b")]);
}
