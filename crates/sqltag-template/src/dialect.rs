//! Backend-specific escaping rules.

use std::fmt;

use crate::error::Result;
use crate::identifier::{self, IdentifierObject};
use crate::value::{Value, format_timestamp};

/// Escaping strategy for one database backend.
///
/// A compiled template only depends on its dialect through these methods,
/// so the same [`Sql`](crate::Sql) can be compiled for several backends.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Placeholder for the parameter at 1-based `index`.
    fn escape_param(&self, index: usize) -> String;

    /// Quote an identifier.
    fn escape_identifier(&self, name: &str) -> String;

    /// Validate the field combination of a structured identifier.
    fn check_identifier_object(&self, object: &IdentifierObject) -> Result<()> {
        identifier::check_identifier_object(object)
    }

    /// SQL for one value inside a VALUES batch.
    ///
    /// The default binds the value as a parameter. Dialects whose drivers
    /// can't bind some kinds convert those first.
    fn value_to_sql(&self, value: &Value, params: &mut Vec<Value>) -> String {
        params.push(value.clone());
        self.escape_param(params.len())
    }
}

fn quote(name: &str, open: char, close: char) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(open);
    for c in name.chars() {
        if c == close {
            quoted.push(close);
        }
        quoted.push(c);
    }
    quoted.push(close);
    quoted
}

/// JSON documents and arrays as JSON text.
fn json_as_text(value: &Value) -> Option<Value> {
    match value {
        Value::Json(_) | Value::Array(_) => Some(Value::Text(value.to_json().to_string())),
        _ => None,
    }
}

/// PostgreSQL: `$1` placeholders, `"double quoted"` identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn escape_param(&self, index: usize) -> String {
        format!("${index}")
    }

    fn escape_identifier(&self, name: &str) -> String {
        quote(name, '"', '"')
    }
}

/// MySQL: `?` placeholders, `` `backtick` `` identifiers. JSON and arrays
/// are bound as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn escape_param(&self, _index: usize) -> String {
        "?".to_owned()
    }

    fn escape_identifier(&self, name: &str) -> String {
        quote(name, '`', '`')
    }

    fn value_to_sql(&self, value: &Value, params: &mut Vec<Value>) -> String {
        params.push(json_as_text(value).unwrap_or_else(|| value.clone()));
        self.escape_param(params.len())
    }
}

/// SQLite: `?` placeholders, `"double quoted"` identifiers. Booleans are
/// bound as 0/1; JSON, arrays and timestamps as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn escape_param(&self, _index: usize) -> String {
        "?".to_owned()
    }

    fn escape_identifier(&self, name: &str) -> String {
        quote(name, '"', '"')
    }

    fn value_to_sql(&self, value: &Value, params: &mut Vec<Value>) -> String {
        let bound = match value {
            Value::Bool(b) => Value::Int(i64::from(*b)),
            Value::Timestamp(ts) => Value::Text(format_timestamp(ts)),
            other => json_as_text(other).unwrap_or_else(|| other.clone()),
        };
        params.push(bound);
        self.escape_param(params.len())
    }
}

/// SQL Server: `@p1` placeholders, `[bracketed]` identifiers. JSON and
/// arrays are bound as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mssql;

impl Dialect for Mssql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn escape_param(&self, index: usize) -> String {
        format!("@p{index}")
    }

    fn escape_identifier(&self, name: &str) -> String {
        quote(name, '[', ']')
    }

    fn value_to_sql(&self, value: &Value, params: &mut Vec<Value>) -> String {
        params.push(json_as_text(value).unwrap_or_else(|| value.clone()));
        self.escape_param(params.len())
    }
}
