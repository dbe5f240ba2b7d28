//! The chunk model templates are built from.

use crate::dialect::Dialect;
use crate::error::{Result, TemplateError};
use crate::identifier::Identifier;
use crate::template::Sql;
use crate::value::Value;

/// One piece of a SQL template.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// Literal SQL text, emitted verbatim.
    Text(String),
    /// A bound parameter.
    Param(Value),
    /// A quoted identifier. Never bound.
    Identifier(Identifier),
    /// A `(..), (..)` VALUES batch.
    Values(Vec<Vec<Arg>>),
    /// Unescaped SQL text.
    Raw(String),
    /// The `default` keyword.
    Default,
}

impl Chunk {
    /// Compile this chunk, pushing any bound values onto `params`.
    pub fn resolve(&self, dialect: &dyn Dialect, params: &mut Vec<Value>) -> Result<String> {
        match self {
            Self::Text(text) | Self::Raw(text) => Ok(text.clone()),
            Self::Default => Ok(DEFAULT.to_owned()),
            Self::Identifier(identifier) => identifier.resolve(dialect),
            Self::Param(value) => {
                params.push(value.clone());
                Ok(dialect.escape_param(params.len()))
            }
            Self::Values(rows) => resolve_values(rows, dialect, params),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Param(_) => "parameter",
            Self::Identifier(_) => "identifier",
            Self::Values(_) => "values",
            Self::Raw(_) => "raw",
            Self::Default => "default",
        }
    }
}

const DEFAULT: &str = "default";

/// Anything that can be interpolated into a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A value, bound as a parameter.
    Value(Value),
    /// A special chunk, kept as-is.
    Chunk(Chunk),
    /// A nested fragment, spliced in.
    Fragment(Sql),
    /// A missing value, such as an absent key in dynamic input. Always
    /// rejected.
    Undefined,
    /// A value that has no SQL meaning, such as a callable. Always rejected.
    Unsupported {
        /// What it was.
        kind: &'static str,
    },
}

impl Arg {
    /// Mark a value that can't be bound.
    #[must_use]
    pub fn unsupported(kind: &'static str) -> Self {
        Self::Unsupported { kind }
    }

    /// Look up dynamic input, mapping a missing entry to [`Arg::Undefined`].
    #[must_use]
    pub fn from_lookup(value: Option<&serde_json::Value>) -> Self {
        value.map_or(Self::Undefined, |json| Self::Value(json.clone().into()))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Value(value) => value.kind(),
            Self::Chunk(chunk) => chunk.kind(),
            Self::Fragment(_) => "fragment",
            Self::Undefined => "undefined",
            Self::Unsupported { kind } => *kind,
        }
    }
}

macro_rules! impl_arg_from_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Self::Value(value.into())
                }
            }
        )+
    };
}

impl_arg_from_value!(
    Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    &str,
    String,
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
);

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        Self::Value(value.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Arg {
    fn from(value: Vec<T>) -> Self {
        Self::Value(value.into())
    }
}

impl From<Chunk> for Arg {
    fn from(chunk: Chunk) -> Self {
        Self::Chunk(chunk)
    }
}

impl From<Sql> for Arg {
    fn from(fragment: Sql) -> Self {
        Self::Fragment(fragment)
    }
}

impl From<&Sql> for Arg {
    fn from(fragment: &Sql) -> Self {
        Self::Fragment(fragment.clone())
    }
}

/// Interpolate a quoted identifier.
///
/// Accepts a name, an [`IdentifierObject`](crate::IdentifierObject), a list
/// of either, or dynamic JSON input.
pub fn identifier(input: impl Into<Identifier>) -> Chunk {
    Chunk::Identifier(input.into())
}

/// Interpolate a VALUES batch. Rows may hold values, [`raw`] chunks and
/// [`default_marker`]; see [`row!`](crate::row).
///
/// Rows are checked when the batch is interpolated.
pub fn values(rows: Vec<Vec<Arg>>) -> Chunk {
    Chunk::Values(rows)
}

/// Interpolate unescaped SQL text.
///
/// Only scalars are accepted, since the text bypasses all escaping.
pub fn raw(value: impl Into<Arg>) -> Result<Chunk> {
    match value.into() {
        Arg::Undefined => Err(TemplateError::RawUndefined),
        Arg::Value(value) => match value {
            Value::Null => Err(TemplateError::RawNull),
            Value::Array(_) | Value::Json(serde_json::Value::Array(_)) => {
                Err(TemplateError::RawArray)
            }
            Value::Json(serde_json::Value::Null) => Err(TemplateError::RawNull),
            other => other
                .to_text()
                .map(Chunk::Raw)
                .ok_or(TemplateError::RawObject),
        },
        Arg::Chunk(Chunk::Raw(text)) => Ok(Chunk::Raw(text)),
        Arg::Chunk(_) | Arg::Fragment(_) => Err(TemplateError::RawObject),
        Arg::Unsupported { kind } => Err(TemplateError::UnsupportedParameter { kind }),
    }
}

/// Interpolate the `default` keyword.
#[must_use]
pub fn default_marker() -> Chunk {
    Chunk::Default
}

/// Check the shape of a VALUES batch.
pub(crate) fn check_rows(rows: &[Vec<Arg>]) -> Result<()> {
    let first = rows.first().ok_or(TemplateError::ValuesEmpty)?;
    let expected = first.len();

    for (row_index, row) in rows.iter().enumerate() {
        if row.is_empty() {
            return Err(TemplateError::ValuesEmptyRow { row: row_index });
        }
        if row.len() != expected {
            return Err(TemplateError::ValuesRowLength {
                row: row_index,
                expected,
                found: row.len(),
            });
        }
        for (column, item) in row.iter().enumerate() {
            check_row_item(item, row_index, column)?;
        }
    }
    Ok(())
}

fn check_row_item(item: &Arg, row: usize, column: usize) -> Result<()> {
    match item {
        Arg::Value(_) | Arg::Chunk(Chunk::Raw(_) | Chunk::Default) => Ok(()),
        Arg::Undefined => Err(TemplateError::UndefinedParameter),
        other => Err(TemplateError::ValuesInvalidItem {
            row,
            column,
            kind: other.kind(),
        }),
    }
}

fn resolve_values(
    rows: &[Vec<Arg>],
    dialect: &dyn Dialect,
    params: &mut Vec<Value>,
) -> Result<String> {
    check_rows(rows)?;

    let mut out = String::new();
    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            out.push_str(", ");
        }
        out.push('(');
        for (column, item) in row.iter().enumerate() {
            if column > 0 {
                out.push_str(", ");
            }
            match item {
                Arg::Value(value) => out.push_str(&dialect.value_to_sql(value, params)),
                Arg::Chunk(Chunk::Raw(text)) => out.push_str(text),
                Arg::Chunk(Chunk::Default) => out.push_str(DEFAULT),
                other => {
                    return Err(TemplateError::ValuesInvalidItem {
                        row: row_index,
                        column,
                        kind: other.kind(),
                    });
                }
            }
        }
        out.push(')');
    }
    Ok(out)
}
