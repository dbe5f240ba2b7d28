//! # sqltag-template
//!
//! Tagged-template SQL compiler with pluggable dialects.
//!
//! A template is literal SQL text with interpolated arguments. Plain values
//! become bound parameters and are never spliced into the SQL text;
//! identifiers, VALUES batches, raw text and the `default` keyword are
//! interpolated through explicit constructors. Compiling a template against
//! a [`Dialect`] yields a [`CompiledQuery`]: the SQL string plus its
//! positional parameters.
//!
//! ## Dialects
//!
//! | dialect | placeholder | identifier |
//! |---------|-------------|------------|
//! | [`Postgres`] | `$1` | `"name"` |
//! | [`MySql`] | `?` | `` `name` `` |
//! | [`Sqlite`] | `?` | `"name"` |
//! | [`Mssql`] | `@p1` | `[name]` |
//!
//! ## Example
//!
//! ```
//! use sqltag_template::{Postgres, default_marker, identifier, row, sql, values};
//!
//! let query = sql!(
//!     "insert into {} values {};",
//!     identifier("users"),
//!     values(vec![row![1, default_marker()]]),
//! )?;
//!
//! let compiled = query.to_sql(&Postgres)?;
//! assert_eq!(compiled.query, r#"insert into "users" values ($1, default);"#);
//! # Ok::<(), sqltag_template::TemplateError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod chunk;
pub mod dialect;
pub mod error;
pub mod identifier;
pub mod template;
pub mod value;

pub use chunk::{Arg, Chunk, default_marker, identifier, raw, values};
pub use dialect::{Dialect, Mssql, MySql, Postgres, Sqlite};
pub use error::{Result, TemplateError};
pub use identifier::{Identifier, IdentifierObject, check_identifier_object};
pub use template::{CompiledQuery, Sql};
pub use value::Value;

/// Build a [`Sql`] fragment from a `{}` template.
///
/// Each argument is converted with [`Arg::from`]. Returns
/// `Result<Sql, TemplateError>`.
///
/// ```
/// use sqltag_template::{MySql, sql};
///
/// let query = sql!("select * from users where id = {} and role = {}", 7, "admin")?;
/// assert_eq!(query.to_sql(&MySql)?.query, "select * from users where id = ? and role = ?");
/// # Ok::<(), sqltag_template::TemplateError>(())
/// ```
#[macro_export]
macro_rules! sql {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::Sql::format($template, ::std::vec![$($crate::Arg::from($arg)),*])
    };
}

/// Build one VALUES row.
///
/// ```
/// use sqltag_template::{default_marker, row};
///
/// let row = row![1, "ann", default_marker()];
/// assert_eq!(row.len(), 3);
/// ```
#[macro_export]
macro_rules! row {
    ($($item:expr),* $(,)?) => {
        ::std::vec![$($crate::Arg::from($item)),*]
    };
}
