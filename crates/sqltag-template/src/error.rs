//! Template construction and compilation errors.

use thiserror::Error;

/// Errors raised while building or compiling a SQL template.
///
/// These are programming errors, reported synchronously from
/// [`Sql::new`](crate::Sql::new), [`raw`](crate::raw) and
/// [`Sql::to_sql`](crate::Sql::to_sql).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// An interpolated value was missing.
    #[error("can't specify undefined as parameter, maybe you meant default")]
    UndefinedParameter,

    /// An interpolated value has a kind that can't be bound.
    #[error("can't specify {kind} as parameter")]
    UnsupportedParameter {
        /// What was interpolated.
        kind: &'static str,
    },

    /// `raw` was given an array.
    #[error("raw value can't be an array")]
    RawArray,

    /// `raw` was given an object or a SQL fragment.
    #[error("raw value can't be an object")]
    RawObject,

    /// `raw` was given null.
    #[error("raw value can't be null")]
    RawNull,

    /// `raw` was given a missing value.
    #[error("raw value can't be undefined")]
    RawUndefined,

    /// An identifier object declared a field without a value.
    #[error("identifier field `{field}` is undefined, omit it instead")]
    IdentifierUndefinedField {
        /// The offending field.
        field: &'static str,
    },

    /// An identifier object field is not a string.
    #[error("identifier field `{field}` must be a string, found {found}")]
    IdentifierFieldType {
        /// The offending field.
        field: &'static str,
        /// Kind of the value found.
        found: &'static str,
    },

    /// An identifier object has none of schema, table or column.
    #[error("identifier object: need at least one parameter of schema, table or column")]
    IdentifierEmpty,

    /// An identifier object names a schema and a column but no table.
    #[error("identifier object: need table when schema and column are set")]
    IdentifierNeedTable,

    /// An identifier object only has an alias.
    #[error("identifier object: only as is set, need schema, table or column")]
    IdentifierOnlyAs,

    /// An identifier object has an alias but neither a table nor a column.
    #[error("identifier object: as needs column or table")]
    IdentifierAliasTarget,

    /// Identifier arrays can't be nested.
    #[error("identifier arrays can't contain arrays")]
    IdentifierNestedArray,

    /// An identifier input is not a string, object or array.
    #[error("identifier must be a string, object or array, found {found}")]
    IdentifierInvalid {
        /// Kind of the value found.
        found: &'static str,
    },

    /// A VALUES batch has no rows.
    #[error("values needs at least one row")]
    ValuesEmpty,

    /// A VALUES row has no items.
    #[error("values row {row} is empty")]
    ValuesEmptyRow {
        /// Zero-based row index.
        row: usize,
    },

    /// VALUES rows differ in length.
    #[error("values row {row} has {found} items, expected {expected}")]
    ValuesRowLength {
        /// Zero-based row index.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of this row.
        found: usize,
    },

    /// A VALUES row holds something other than a value, raw or default.
    #[error("values row {row} item {column} can't be {kind}")]
    ValuesInvalidItem {
        /// Zero-based row index.
        row: usize,
        /// Zero-based item index.
        column: usize,
        /// Kind of the item found.
        kind: &'static str,
    },

    /// Literal and argument counts don't line up.
    #[error("template has {expected} placeholders but {found} arguments")]
    ArgumentCount {
        /// Placeholders in the template.
        expected: usize,
        /// Arguments given.
        found: usize,
    },

    /// A format template has a stray brace.
    #[error("unmatched `{brace}` at byte {position} in template")]
    UnmatchedBrace {
        /// The stray brace.
        brace: char,
        /// Byte offset in the template.
        position: usize,
    },
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
