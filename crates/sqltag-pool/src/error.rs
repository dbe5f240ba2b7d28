//! Pool error types.

use std::time::Duration;

use thiserror::Error;

/// Errors returned to the caller of a pool operation.
///
/// Factory failures never surface here: they are logged and the pool keeps
/// serving waiters, which eventually get a resource or time out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool is draining and accepts no new work.
    #[error("pool is draining and cannot accept work")]
    Draining,

    /// The waiting queue is full and nothing can be handed out.
    #[error("max waiting clients count exceeded (limit {max})")]
    MaxWaitingClients {
        /// Configured queue limit.
        max: usize,
    },

    /// No resource was dispatched before the acquire timeout elapsed.
    #[error("resource request timed out after {timeout:?}")]
    AcquireTimeout {
        /// Configured acquire timeout.
        timeout: Duration,
    },

    /// The resource has no active loan in this pool.
    #[error("resource not currently part of this pool")]
    NotInPool,

    /// The pool went away before the request settled.
    #[error("pool closed before the request settled")]
    Closed,

    /// Pool options could not be parsed.
    #[error("invalid pool configuration: {0}")]
    Config(String),
}
