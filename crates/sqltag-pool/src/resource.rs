//! Bookkeeping records for pooled resources, pending requests and loans.

use std::fmt;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::deferred::{Deferred, DeferredState};
use crate::error::PoolError;

/// Pool-local identifier of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u64);

impl ResourceId {
    /// Raw numeric id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a pooled resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Sitting in the available set.
    Idle,
    /// Checked out to a caller.
    Allocated,
    /// Being validated before handout.
    Validation,
    /// Handed back and on its way to the available set.
    Returning,
    /// Marked for destruction.
    Invalid,
}

/// A resource owned by the pool, with its lifecycle timestamps.
#[derive(Debug)]
pub struct PooledResource<R> {
    id: ResourceId,
    resource: R,
    state: ResourceState,
    created_at: Instant,
    last_idle_at: Instant,
    last_borrowed_at: Option<Instant>,
    last_returned_at: Option<Instant>,
}

impl<R> PooledResource<R> {
    /// Wrap a freshly created resource.
    pub(crate) fn new(id: ResourceId, resource: R) -> Self {
        let now = Instant::now();
        Self {
            id,
            resource,
            state: ResourceState::Idle,
            created_at: now,
            last_idle_at: now,
            last_borrowed_at: None,
            last_returned_at: None,
        }
    }

    /// Rebuild the record for a resource coming back from a loan.
    pub(crate) fn returned(loan: ResourceLoan, resource: R) -> Self {
        let now = Instant::now();
        Self {
            id: loan.resource_id,
            resource,
            state: ResourceState::Returning,
            created_at: loan.resource_created_at,
            last_idle_at: loan.last_idle_at,
            last_borrowed_at: Some(loan.created_at),
            last_returned_at: Some(now),
        }
    }

    /// Resource id.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// When the factory produced the resource.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the resource last entered the available set.
    #[must_use]
    pub fn last_idle_at(&self) -> Instant {
        self.last_idle_at
    }

    /// When the resource was last checked out.
    #[must_use]
    pub fn last_borrowed_at(&self) -> Option<Instant> {
        self.last_borrowed_at
    }

    /// When the resource was last handed back.
    #[must_use]
    pub fn last_returned_at(&self) -> Option<Instant> {
        self.last_returned_at
    }

    /// How long the resource has been idle as of `now`.
    #[must_use]
    pub fn idle_time(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_idle_at)
    }

    pub(crate) fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    pub(crate) fn into_resource(self) -> R {
        self.resource
    }

    pub(crate) fn idle(&mut self) {
        self.last_idle_at = Instant::now();
        self.state = ResourceState::Idle;
    }

    pub(crate) fn test(&mut self) {
        self.state = ResourceState::Validation;
    }

    pub(crate) fn invalidate(&mut self) {
        self.state = ResourceState::Invalid;
    }

    /// Split into the loan record the pool keeps and the resource the caller
    /// receives.
    pub(crate) fn allocate(mut self) -> (ResourceLoan, R) {
        self.state = ResourceState::Allocated;
        let loan = ResourceLoan {
            resource_id: self.id,
            resource_created_at: self.created_at,
            last_idle_at: self.last_idle_at,
            created_at: Instant::now(),
        };
        (loan, self.resource)
    }
}

/// The pool's record of an active checkout.
///
/// A loan has no failure path: it ends when the resource is released or
/// destroyed and the pool removes the record.
#[derive(Debug, Clone)]
pub struct ResourceLoan {
    resource_id: ResourceId,
    resource_created_at: Instant,
    last_idle_at: Instant,
    created_at: Instant,
}

impl ResourceLoan {
    /// Id of the loaned resource.
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// When the loan started.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

/// One caller's pending `acquire`.
pub(crate) struct ResourceRequest<T> {
    deferred: Deferred<T, PoolError>,
    created_at: Instant,
    timeout: Option<Duration>,
}

impl<T> ResourceRequest<T> {
    pub(crate) fn new(
        timeout: Option<Duration>,
    ) -> (Self, oneshot::Receiver<Result<T, PoolError>>) {
        let (deferred, receiver) = Deferred::new();
        let request = Self {
            deferred,
            created_at: Instant::now(),
            timeout,
        };
        (request, receiver)
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.deferred.is_pending()
    }

    pub(crate) fn state(&self) -> DeferredState {
        self.deferred.state()
    }

    pub(crate) fn resolve(&mut self, value: T) -> Result<(), T> {
        self.deferred.resolve(value)
    }

    pub(crate) fn reject(&mut self, error: PoolError) -> bool {
        self.deferred.reject(error)
    }

    pub(crate) fn waited(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl<T> fmt::Debug for ResourceRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRequest")
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .field("timeout", &self.timeout)
            .finish()
    }
}
