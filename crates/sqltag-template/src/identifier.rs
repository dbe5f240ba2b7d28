//! Identifier inputs and their resolution into quoted SQL.

use crate::dialect::Dialect;
use crate::error::{Result, TemplateError};

/// A structured `schema.table.column as alias` reference.
///
/// Absent parts are omitted from the output. Which combinations are valid is
/// decided by [`Dialect::check_identifier_object`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierObject {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub table: Option<String>,
    /// Column name.
    pub column: Option<String>,
    /// Alias, rendered after `as`.
    pub alias: Option<String>,
}

impl IdentifierObject {
    /// Create an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the table.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the column.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Set the alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Read an object from dynamic input with `schema`, `table`, `column`
    /// and `as` keys. Other keys are ignored.
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        Ok(Self {
            schema: json_field(map, "schema")?,
            table: json_field(map, "table")?,
            column: json_field(map, "column")?,
            alias: json_field(map, "as")?,
        })
    }

    fn render(&self, dialect: &dyn Dialect) -> String {
        let path = [&self.schema, &self.table, &self.column]
            .into_iter()
            .flatten()
            .map(|part| dialect.escape_identifier(part))
            .collect::<Vec<_>>()
            .join(".");
        match &self.alias {
            Some(alias) => format!("{path} as {}", dialect.escape_identifier(alias)),
            None => path,
        }
    }
}

fn json_field(
    map: &serde_json::Map<String, serde_json::Value>,
    field: &'static str,
) -> Result<Option<String>> {
    match map.get(field) {
        None => Ok(None),
        Some(serde_json::Value::Null) => Err(TemplateError::IdentifierUndefinedField { field }),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(TemplateError::IdentifierFieldType {
            field,
            found: json_kind(other),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// The field combination rules every dialect applies by default.
pub fn check_identifier_object(object: &IdentifierObject) -> Result<()> {
    let has_path = object.schema.is_some() || object.table.is_some() || object.column.is_some();
    if !has_path {
        return Err(match object.alias {
            Some(_) => TemplateError::IdentifierOnlyAs,
            None => TemplateError::IdentifierEmpty,
        });
    }
    if object.schema.is_some() && object.column.is_some() && object.table.is_none() {
        return Err(TemplateError::IdentifierNeedTable);
    }
    if object.alias.is_some() && object.column.is_none() && object.table.is_none() {
        return Err(TemplateError::IdentifierAliasTarget);
    }
    Ok(())
}

/// Anything [`identifier`](crate::identifier) accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    /// A single name.
    Name(String),
    /// A structured reference.
    Object(IdentifierObject),
    /// A comma-separated list. Lists can't nest.
    List(Vec<Identifier>),
    /// Dynamic input: a string, an object, or an array of those.
    Json(serde_json::Value),
}

impl Identifier {
    /// Quote through `dialect`.
    pub fn resolve(&self, dialect: &dyn Dialect) -> Result<String> {
        match self {
            Self::List(items) => resolve_list(items.iter().map(ListItem::Typed), dialect),
            Self::Json(serde_json::Value::Array(items)) => {
                resolve_list(items.iter().map(ListItem::Json), dialect)
            }
            single => resolve_single(single, dialect),
        }
    }
}

enum ListItem<'a> {
    Typed(&'a Identifier),
    Json(&'a serde_json::Value),
}

fn resolve_list<'a>(
    items: impl Iterator<Item = ListItem<'a>>,
    dialect: &dyn Dialect,
) -> Result<String> {
    let mut parts = Vec::new();
    for item in items {
        let part = match item {
            ListItem::Typed(Identifier::List(_))
            | ListItem::Typed(Identifier::Json(serde_json::Value::Array(_)))
            | ListItem::Json(serde_json::Value::Array(_)) => {
                return Err(TemplateError::IdentifierNestedArray);
            }
            ListItem::Typed(identifier) => resolve_single(identifier, dialect)?,
            ListItem::Json(json) => json_single(json, dialect)?,
        };
        parts.push(part);
    }
    Ok(parts.join(", "))
}

fn resolve_single(identifier: &Identifier, dialect: &dyn Dialect) -> Result<String> {
    match identifier {
        Identifier::Name(name) => Ok(dialect.escape_identifier(name)),
        Identifier::Object(object) => {
            dialect.check_identifier_object(object)?;
            Ok(object.render(dialect))
        }
        Identifier::Json(json) => json_single(json, dialect),
        Identifier::List(_) => Err(TemplateError::IdentifierNestedArray),
    }
}

fn json_single(json: &serde_json::Value, dialect: &dyn Dialect) -> Result<String> {
    match json {
        serde_json::Value::String(name) => Ok(dialect.escape_identifier(name)),
        serde_json::Value::Object(map) => {
            let object = IdentifierObject::from_json(map)?;
            resolve_single(&Identifier::Object(object), dialect)
        }
        serde_json::Value::Array(_) => Err(TemplateError::IdentifierNestedArray),
        other => Err(TemplateError::IdentifierInvalid {
            found: json_kind(other),
        }),
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<IdentifierObject> for Identifier {
    fn from(object: IdentifierObject) -> Self {
        Self::Object(object)
    }
}

impl From<serde_json::Value> for Identifier {
    fn from(json: serde_json::Value) -> Self {
        Self::Json(json)
    }
}

impl<T: Into<Identifier>> From<Vec<T>> for Identifier {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Identifier>, const N: usize> From<[T; N]> for Identifier {
    fn from(items: [T; N]) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}
