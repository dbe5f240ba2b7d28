//! Client error types.

use sqltag_pool::PoolError;
use sqltag_template::TemplateError;
use thiserror::Error;

/// Errors from running a query.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool could not provide a connection.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// The template failed to build or compile.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The driver failed to run the query.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A column lookup failed.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A column value has the wrong type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Requested type.
        expected: &'static str,
        /// Kind of the stored value.
        actual: &'static str,
    },
}

impl Error {
    /// Wrap a driver error.
    pub fn connection(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connection(Box::new(error))
    }

    /// Check if the error came from the pool rather than the query.
    #[must_use]
    pub fn is_pool(&self) -> bool {
        matches!(self, Self::Pool(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
