//! Resource pool implementation.
//!
//! All bookkeeping lives in one [`PoolState`] behind a `parking_lot` mutex.
//! The mutex is only held for synchronous passes (dispatch, eviction,
//! minimum maintenance). Those passes queue [`Action`]s that run after the
//! lock is released: factory calls are spawned onto the Tokio runtime and
//! resources are handed to waiting callers.

use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::PoolConfig;
use crate::deque::{Cursor, Deque};
use crate::error::PoolError;
use crate::evictor::{DefaultEvictor, EvictionConfig, Evictor};
use crate::factory::Factory;
use crate::priority_queue::{PriorityQueue, QueueHandle};
use crate::recycling::RecyclingConfig;
use crate::resource::{PooledResource, ResourceId, ResourceLoan, ResourceRequest};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A generic asynchronous resource pool.
///
/// Callers [`acquire`](Pool::acquire) a [`Lease`], use the resource through
/// it, and hand it back with [`release`](Pool::release) or
/// [`destroy`](Pool::destroy). A lease that is simply dropped is returned to
/// the pool.
///
/// Waiting callers are served in priority order, FIFO within a priority.
/// Idle resources are handed out LIFO unless `fifo` is configured.
///
/// The pool spawns its factory calls and evictor onto the ambient Tokio
/// runtime, so it must be created and used from within one.
///
/// # Example
///
/// ```rust,ignore
/// use sqltag_pool::{Pool, PoolConfig};
///
/// let pool = Pool::new(factory, PoolConfig::new().min(2).max(10));
///
/// let mut conn = pool.acquire().await?;
/// conn.ping().await?;
/// pool.release(conn).await?;
///
/// pool.drain().await;
/// pool.clear().await;
/// ```
pub struct Pool<F: Factory> {
    shared: Arc<PoolShared<F>>,
}

impl<F: Factory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

pub(crate) struct PoolShared<F: Factory> {
    id: u64,
    factory: F,
    config: PoolConfig,
    evictor: Box<dyn Evictor>,
    state: Mutex<PoolState<F>>,
    /// Signalled after every state change; backs `drain`, `clear` and `ready`.
    changed: Notify,
    next_resource_id: AtomicU64,
    created_at: Instant,
}

struct PoolState<F: Factory> {
    started: bool,
    draining: bool,
    available: Deque<PooledResource<F::Resource>>,
    eviction_cursor: Cursor,
    waiting: PriorityQueue<ResourceRequest<Lease<F>>>,
    loans: HashMap<ResourceId, ResourceLoan>,
    /// Resources that exist: available, loaned or validating.
    all_objects: usize,
    validating: usize,
    creating: usize,
    destroying: usize,
    evictor_task: Option<JoinHandle<()>>,
    recycling: Option<RecyclingConfig>,
    metrics: PoolMetricsInner,
}

impl<F: Factory> PoolState<F> {
    fn size(&self) -> usize {
        self.all_objects + self.creating
    }

    fn potentially_allocable(&self) -> usize {
        self.available.len() + self.validating + self.creating
    }
}

/// Internal metrics tracking.
#[derive(Debug, Default, Clone, Copy)]
struct PoolMetricsInner {
    resources_created: u64,
    resources_destroyed: u64,
    create_failures: u64,
    destroy_failures: u64,
    validation_failures: u64,
    acquisitions: u64,
    acquire_timeouts: u64,
    evictions: u64,
}

/// Follow-up work produced while the state lock is held.
enum Action<F: Factory> {
    Create,
    Validate(PooledResource<F::Resource>),
    Deliver(ResourceRequest<Lease<F>>, Lease<F>),
    Destroy(PooledResource<F::Resource>),
}

impl<F: Factory> Pool<F> {
    /// Create a new pool builder.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Create a pool with the default eviction policy.
    ///
    /// The configuration is [normalized](PoolConfig::normalized) first. With
    /// `autostart` (the default) the evictor is scheduled and the pool starts
    /// filling up to `min` right away.
    pub fn new(factory: F, config: PoolConfig) -> Self {
        Self::with_evictor(factory, config, Box::new(DefaultEvictor))
    }

    /// Create a pool with a custom eviction policy.
    pub fn with_evictor(factory: F, config: PoolConfig, evictor: Box<dyn Evictor>) -> Self {
        let config = config.normalized();
        let state = PoolState {
            started: false,
            draining: false,
            available: Deque::new(),
            eviction_cursor: Cursor::default(),
            waiting: PriorityQueue::new(config.priority_range),
            loans: HashMap::new(),
            all_objects: 0,
            validating: 0,
            creating: 0,
            destroying: 0,
            evictor_task: None,
            recycling: None,
            metrics: PoolMetricsInner::default(),
        };
        let shared = Arc::new(PoolShared {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            factory,
            config,
            evictor,
            state: Mutex::new(state),
            changed: Notify::new(),
            next_resource_id: AtomicU64::new(1),
            created_at: Instant::now(),
        });

        tracing::info!(
            pool_id = shared.id,
            min = shared.config.min,
            max = shared.config.max,
            fifo = shared.config.fifo,
            "resource pool created"
        );

        if shared.config.autostart {
            shared.start();
        }
        Self { shared }
    }

    /// Schedule the evictor and fill the pool up to `min`.
    ///
    /// Does nothing if the pool is already started or draining. Called
    /// automatically on construction with `autostart`, or by the first
    /// `acquire` otherwise.
    pub fn start(&self) {
        self.shared.start();
    }

    /// Acquire a resource at the highest priority.
    pub async fn acquire(&self) -> Result<Lease<F>, PoolError> {
        self.acquire_with_priority(0).await
    }

    /// Acquire a resource, queueing at `priority` (0 is highest) if none is
    /// available. Out-of-range priorities queue at the lowest priority.
    pub async fn acquire_with_priority(&self, priority: usize) -> Result<Lease<F>, PoolError> {
        let shared = &self.shared;
        let (request, mut receiver) = ResourceRequest::new(shared.config.acquire_timeout);

        let handle = shared.with_state(|state, actions| {
            if !state.started {
                shared.start_locked(state, actions);
            }
            if state.draining {
                return Err(PoolError::Draining);
            }
            if let Some(max) = shared.config.max_waiting_clients {
                if shared.spare_capacity(state) < 1
                    && state.available.is_empty()
                    && state.waiting.len() >= max
                {
                    return Err(PoolError::MaxWaitingClients { max });
                }
            }
            let handle = state.waiting.enqueue(request, priority);
            tracing::trace!(
                pool_id = shared.id,
                priority = handle.priority(),
                pending = state.waiting.len(),
                "resource requested"
            );
            shared.dispatch(state, actions);
            Ok(handle)
        })?;

        let mut queued = QueuedRequest {
            shared,
            handle: Some(handle),
        };
        let settled = match shared.config.acquire_timeout {
            None => (&mut receiver).await,
            Some(timeout) => match tokio::time::timeout(timeout, &mut receiver).await {
                Ok(settled) => settled,
                Err(_) => {
                    let error = PoolError::AcquireTimeout { timeout };
                    queued.withdraw(error.clone());
                    // dispatch may have won the race right at the deadline
                    return receiver.try_recv().unwrap_or(Err(error));
                }
            },
        };
        queued.handle = None;
        settled.unwrap_or(Err(PoolError::Closed))
    }

    /// Return a leased resource to the pool.
    ///
    /// Fails with [`PoolError::NotInPool`] if the lease belongs to another
    /// pool; the resource then goes back to the pool that lent it.
    ///
    /// With [recycling](crate::RecyclingPool) enabled, a resource past its
    /// recycle age is destroyed instead while the pool is above `min`.
    pub async fn release(&self, lease: Lease<F>) -> Result<(), PoolError> {
        if let Some(pooled) = self.shared.release_lease(lease)? {
            Arc::clone(&self.shared).destroy_resource(pooled).await;
        }
        Ok(())
    }

    /// Destroy a leased resource instead of returning it, then top the pool
    /// back up to `min`.
    ///
    /// Waits for the factory's `destroy` (bounded by `destroy_timeout`).
    /// Factory failures are logged, not returned.
    pub async fn destroy(&self, mut lease: Lease<F>) -> Result<(), PoolError> {
        let shared = &self.shared;
        if !Arc::ptr_eq(&lease.pool, shared) {
            return Err(PoolError::NotInPool);
        }
        let Some(resource) = lease.resource.take() else {
            return Err(PoolError::NotInPool);
        };
        let id = lease.id;

        let pooled = shared.with_state(|state, actions| {
            let loan = state.loans.remove(&id).ok_or(PoolError::NotInPool)?;
            let mut pooled = PooledResource::returned(loan, resource);
            pooled.invalidate();
            state.all_objects -= 1;
            state.destroying += 1;
            tracing::debug!(pool_id = shared.id, resource_id = %id, "destroying leased resource");
            shared.ensure_minimum(state, actions);
            Ok(pooled)
        })?;

        Arc::clone(shared).destroy_resource(pooled).await;
        Ok(())
    }

    /// Acquire a resource, run `f` with it, then release it if `f` succeeded
    /// or destroy it if `f` failed.
    pub async fn use_resource<T, E>(
        &self,
        priority: usize,
        f: impl AsyncFnOnce(&mut F::Resource) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<PoolError>,
    {
        let mut lease = self.acquire_with_priority(priority).await?;
        match f(&mut *lease).await {
            Ok(value) => {
                self.release(lease).await?;
                Ok(value)
            }
            Err(error) => {
                self.destroy(lease).await?;
                Err(error)
            }
        }
    }

    /// Stop accepting work and wait until every queued request has settled
    /// and every lease has been returned, then stop the evictor.
    ///
    /// Resources stay in the pool; follow with [`clear`](Pool::clear) to
    /// destroy them.
    pub async fn drain(&self) {
        let shared = &self.shared;
        shared.with_state(|state, _| {
            state.draining = true;
            state.waiting.retain(ResourceRequest::is_pending);
        });
        tracing::info!(pool_id = shared.id, "draining pool");

        shared
            .wait_until(|state| {
                state.waiting.retain(ResourceRequest::is_pending);
                state.waiting.is_empty()
            })
            .await;
        shared.wait_until(|state| state.loans.is_empty()).await;

        if let Some(task) = shared.with_state(|state, _| state.evictor_task.take()) {
            task.abort();
        }
        tracing::info!(pool_id = shared.id, "pool drained");
    }

    /// Wait for in-flight creations, destroy every available resource and
    /// wait for all destructions to finish.
    pub async fn clear(&self) {
        let shared = &self.shared;
        shared.wait_until(|state| state.creating == 0).await;

        let cleared = shared.with_state(|state, actions| {
            let mut cleared = 0;
            while let Some(pooled) = state.available.shift() {
                shared.schedule_destroy(state, pooled, actions);
                cleared += 1;
            }
            cleared
        });

        shared.wait_until(|state| state.destroying == 0).await;
        tracing::info!(pool_id = shared.id, cleared, "pool cleared");
    }

    /// Resolve once at least `min` resources are available.
    pub async fn ready(&self) {
        let min = self.shared.config.min;
        self.shared
            .wait_until(|state| state.available.len() >= min)
            .await;
    }

    /// Whether `lease` is an active loan of this pool.
    #[must_use]
    pub fn is_borrowed(&self, lease: &Lease<F>) -> bool {
        Arc::ptr_eq(&lease.pool, &self.shared)
            && self.shared.state.lock().loans.contains_key(&lease.id)
    }

    /// All resources, including those being created.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.state.lock().size()
    }

    /// Idle resources ready to be handed out.
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.state.lock().available.len()
    }

    /// Resources currently on loan.
    #[must_use]
    pub fn borrowed(&self) -> usize {
        self.shared.state.lock().loans.len()
    }

    /// Callers waiting for a resource.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.state.lock().waiting.len()
    }

    /// How many more resources the pool may create.
    #[must_use]
    pub fn spare_resource_capacity(&self) -> usize {
        self.shared.spare_capacity(&self.shared.state.lock())
    }

    /// Configured minimum size.
    #[must_use]
    pub fn min(&self) -> usize {
        self.shared.config.min
    }

    /// Configured maximum size.
    #[must_use]
    pub fn max(&self) -> usize {
        self.shared.config.max
    }

    /// Whether [`drain`](Pool::drain) has been called.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.shared.state.lock().draining
    }

    /// Whether the pool has been started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.state.lock().started
    }

    /// The normalized pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// The factory the pool was built with.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.shared.factory
    }

    pub(crate) fn set_recycling(&self, config: RecyclingConfig) {
        self.shared.with_state(|state, _| state.recycling = Some(config));
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        PoolStatus {
            size: state.size(),
            available: state.available.len(),
            borrowed: state.loans.len(),
            pending: state.waiting.len(),
            min: self.shared.config.min,
            max: self.shared.config.max,
        }
    }

    /// Get pool metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let inner = self.shared.state.lock().metrics;
        PoolMetrics {
            resources_created: inner.resources_created,
            resources_destroyed: inner.resources_destroyed,
            create_failures: inner.create_failures,
            destroy_failures: inner.destroy_failures,
            validation_failures: inner.validation_failures,
            acquisitions: inner.acquisitions,
            acquire_timeouts: inner.acquire_timeouts,
            evictions: inner.evictions,
            uptime: self.shared.created_at.elapsed(),
        }
    }
}

impl<F: Factory> fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.shared.id)
            .field("status", &self.status())
            .finish()
    }
}

impl<F: Factory> PoolShared<F> {
    /// Lock the state, run `f`, then wake waiters and run queued actions.
    fn with_state<T>(
        self: &Arc<Self>,
        f: impl FnOnce(&mut PoolState<F>, &mut Vec<Action<F>>) -> T,
    ) -> T {
        let mut actions = Vec::new();
        let output = {
            let mut state = self.state.lock();
            f(&mut state, &mut actions)
        };
        self.changed.notify_waiters();
        self.run(actions);
        output
    }

    async fn wait_until(&self, mut ready: impl FnMut(&mut PoolState<F>) -> bool) {
        loop {
            let notified = self.changed.notified();
            let done = ready(&mut self.state.lock());
            if done {
                return;
            }
            notified.await;
        }
    }

    fn start(self: &Arc<Self>) {
        self.with_state(|state, actions| self.start_locked(state, actions));
    }

    fn start_locked(self: &Arc<Self>, state: &mut PoolState<F>, actions: &mut Vec<Action<F>>) {
        if state.draining || state.started {
            return;
        }
        state.started = true;
        self.schedule_evictor(state);
        self.ensure_minimum(state, actions);
    }

    fn spare_capacity(&self, state: &PoolState<F>) -> usize {
        self.config.max.saturating_sub(state.size())
    }

    fn run(self: &Arc<Self>, actions: Vec<Action<F>>) {
        for action in actions {
            match action {
                Action::Create => {
                    if spawn(Arc::clone(self).create_resource()).is_none() {
                        self.abandon(|state| state.creating -= 1);
                    }
                }
                Action::Validate(pooled) => {
                    if spawn(Arc::clone(self).validate_resource(pooled)).is_none() {
                        self.abandon(|state| {
                            state.validating -= 1;
                            state.all_objects -= 1;
                        });
                    }
                }
                Action::Destroy(pooled) => {
                    if spawn(Arc::clone(self).destroy_resource(pooled)).is_none() {
                        self.abandon(|state| state.destroying -= 1);
                    }
                }
                Action::Deliver(mut request, lease) => {
                    let resource_id = lease.id;
                    let waited = request.waited();
                    match request.resolve(lease) {
                        Ok(()) => tracing::trace!(
                            pool_id = self.id,
                            resource_id = %resource_id,
                            ?waited,
                            "resource dispatched"
                        ),
                        // dropping the lease hands the resource straight back
                        Err(lease) => {
                            tracing::debug!(
                                pool_id = self.id,
                                resource_id = %resource_id,
                                "requester went away before dispatch"
                            );
                            drop(lease);
                        }
                    }
                }
            }
        }
    }

    /// Undo the bookkeeping of an action whose task could not be spawned.
    ///
    /// Does not dispatch: without a runtime any follow-up would fail the
    /// same way.
    fn abandon(&self, undo: impl FnOnce(&mut PoolState<F>)) {
        undo(&mut self.state.lock());
        self.changed.notify_waiters();
    }

    /// The core scheduling pass.
    fn dispatch(self: &Arc<Self>, state: &mut PoolState<F>, actions: &mut Vec<Action<F>>) {
        let waiting = state.waiting.len();
        if waiting < 1 {
            return;
        }

        let shortfall = waiting.saturating_sub(state.potentially_allocable());
        let to_create = shortfall.min(self.spare_capacity(state));
        for _ in 0..to_create {
            state.creating += 1;
            actions.push(Action::Create);
        }

        if self.config.test_on_borrow {
            let to_test = waiting
                .saturating_sub(state.validating)
                .min(state.available.len());
            for _ in 0..to_test {
                if let Some(mut pooled) = state.available.shift() {
                    pooled.test();
                    state.validating += 1;
                    actions.push(Action::Validate(pooled));
                }
            }
        } else {
            let to_dispatch = state.available.len().min(waiting);
            for _ in 0..to_dispatch {
                if let Some(pooled) = state.available.shift() {
                    self.dispatch_to_next_waiting(state, pooled, actions);
                }
            }
        }
    }

    /// Loan `pooled` to the next live waiter, or put it back if none is left.
    fn dispatch_to_next_waiting(
        self: &Arc<Self>,
        state: &mut PoolState<F>,
        pooled: PooledResource<F::Resource>,
        actions: &mut Vec<Action<F>>,
    ) -> bool {
        while let Some(request) = state.waiting.dequeue() {
            if !request.is_pending() {
                continue;
            }
            let created_at = pooled.created_at();
            let (loan, resource) = pooled.allocate();
            let id = loan.resource_id();
            state.loans.insert(id, loan);
            state.metrics.acquisitions += 1;
            let lease = Lease {
                id,
                resource: Some(resource),
                created_at,
                pool: Arc::clone(self),
            };
            actions.push(Action::Deliver(request, lease));
            return true;
        }
        self.add_to_available(state, pooled);
        false
    }

    fn add_to_available(&self, state: &mut PoolState<F>, mut pooled: PooledResource<F::Resource>) {
        pooled.idle();
        if self.config.fifo {
            state.available.push(pooled);
        } else {
            state.available.unshift(pooled);
        }
    }

    fn ensure_minimum(&self, state: &mut PoolState<F>, actions: &mut Vec<Action<F>>) {
        if state.draining {
            return;
        }
        let shortfall = self.config.min.saturating_sub(state.size());
        if shortfall > 0 {
            tracing::trace!(
                pool_id = self.id,
                shortfall,
                "creating resources to reach minimum"
            );
        }
        for _ in 0..shortfall {
            state.creating += 1;
            actions.push(Action::Create);
        }
    }

    fn schedule_destroy(
        &self,
        state: &mut PoolState<F>,
        mut pooled: PooledResource<F::Resource>,
        actions: &mut Vec<Action<F>>,
    ) {
        pooled.invalidate();
        state.all_objects -= 1;
        state.destroying += 1;
        actions.push(Action::Destroy(pooled));
        self.ensure_minimum(state, actions);
    }

    fn release_lease(
        self: &Arc<Self>,
        mut lease: Lease<F>,
    ) -> Result<Option<PooledResource<F::Resource>>, PoolError> {
        if !Arc::ptr_eq(&lease.pool, self) {
            return Err(PoolError::NotInPool);
        }
        match lease.resource.take() {
            Some(resource) => self.return_resource(lease.id, resource),
            None => Err(PoolError::NotInPool),
        }
    }

    /// Take a loaned resource back. Returns the resource when it is due for
    /// recycling; the caller then owns its destruction.
    fn return_resource(
        self: &Arc<Self>,
        id: ResourceId,
        resource: F::Resource,
    ) -> Result<Option<PooledResource<F::Resource>>, PoolError> {
        self.with_state(|state, actions| {
            let loan = state.loans.remove(&id).ok_or(PoolError::NotInPool)?;
            let mut pooled = PooledResource::returned(loan, resource);

            let age = pooled.created_at().elapsed();
            let recycle = state.size() > self.config.min
                && state.recycling.is_some_and(|config| config.is_due(age));
            if recycle {
                tracing::debug!(pool_id = self.id, resource_id = %id, ?age, "recycling resource");
                pooled.invalidate();
                state.all_objects -= 1;
                state.destroying += 1;
                self.ensure_minimum(state, actions);
                self.dispatch(state, actions);
                return Ok(Some(pooled));
            }

            tracing::trace!(pool_id = self.id, resource_id = %id, "resource released");
            self.add_to_available(state, pooled);
            self.dispatch(state, actions);
            Ok(None)
        })
    }

    async fn create_resource(self: Arc<Self>) {
        let created = self.factory.create().await;
        self.with_state(|state, actions| {
            state.creating -= 1;
            match created {
                Ok(resource) => {
                    let id = ResourceId(self.next_resource_id.fetch_add(1, Ordering::Relaxed));
                    state.all_objects += 1;
                    state.metrics.resources_created += 1;
                    tracing::debug!(
                        pool_id = self.id,
                        resource_id = %id,
                        size = state.size(),
                        "resource created"
                    );
                    self.add_to_available(state, PooledResource::new(id, resource));
                }
                Err(error) => {
                    state.metrics.create_failures += 1;
                    tracing::warn!(
                        pool_id = self.id,
                        error = %error,
                        "factory failed to create resource"
                    );
                }
            }
            self.dispatch(state, actions);
        });
    }

    async fn validate_resource(self: Arc<Self>, mut pooled: PooledResource<F::Resource>) {
        let valid = self.factory.validate(pooled.resource_mut()).await;
        self.with_state(|state, actions| {
            state.validating -= 1;
            if valid {
                self.dispatch_to_next_waiting(state, pooled, actions);
            } else {
                state.metrics.validation_failures += 1;
                tracing::debug!(
                    pool_id = self.id,
                    resource_id = %pooled.id(),
                    "resource failed validation"
                );
                self.schedule_destroy(state, pooled, actions);
                self.dispatch(state, actions);
            }
        });
    }

    async fn destroy_resource(self: Arc<Self>, pooled: PooledResource<F::Resource>) {
        let id = pooled.id();
        let destroyed = self.factory.destroy(pooled.into_resource());
        // an elapsed timeout settles the destroy; the resource is no longer tracked
        let outcome = match self.config.destroy_timeout {
            Some(timeout) => tokio::time::timeout(timeout, destroyed)
                .await
                .map_err(|_| timeout),
            None => Ok(destroyed.await),
        };

        self.with_state(|state, _| {
            state.destroying -= 1;
            match outcome {
                Ok(Ok(())) => {
                    state.metrics.resources_destroyed += 1;
                    tracing::debug!(pool_id = self.id, resource_id = %id, "resource destroyed");
                }
                Ok(Err(error)) => {
                    state.metrics.destroy_failures += 1;
                    tracing::warn!(
                        pool_id = self.id,
                        resource_id = %id,
                        error = %error,
                        "factory failed to destroy resource"
                    );
                }
                Err(timeout) => {
                    state.metrics.destroy_failures += 1;
                    tracing::warn!(
                        pool_id = self.id,
                        resource_id = %id,
                        ?timeout,
                        "factory destroy timed out"
                    );
                }
            }
        });
    }

    fn schedule_evictor(self: &Arc<Self>, state: &mut PoolState<F>) {
        let interval = self.config.eviction_run_interval;
        if interval.is_zero() {
            return;
        }
        let pool = Arc::downgrade(self);
        state.evictor_task = spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(shared) = pool.upgrade() else {
                    break;
                };
                shared.evict();
            }
        });
    }

    /// One eviction run over the available set, resuming where the previous
    /// run stopped.
    fn evict(self: &Arc<Self>) {
        self.with_state(|state, actions| {
            let tests = self
                .config
                .num_tests_per_eviction_run
                .min(state.available.len());
            let config = EvictionConfig {
                soft_idle_timeout: self.config.soft_idle_timeout,
                idle_timeout: self.config.idle_timeout,
                min: self.config.min,
            };
            let now = Instant::now();

            let mut tested = 0;
            while tested < tests {
                let Some(handle) = state.eviction_cursor.next(&state.available) else {
                    state.eviction_cursor.reset(&state.available);
                    if state.available.is_empty() {
                        break;
                    }
                    continue;
                };
                tested += 1;

                let Some(resource) = state.available.get(handle) else {
                    continue;
                };
                let idle_time = resource.idle_time(now);
                let available = state.available.len();
                if self.evictor.evict(&config, idle_time, available) {
                    if let Some(pooled) = state.eviction_cursor.remove(&mut state.available) {
                        state.metrics.evictions += 1;
                        tracing::debug!(
                            pool_id = self.id,
                            resource_id = %pooled.id(),
                            ?idle_time,
                            "evicting idle resource"
                        );
                        self.schedule_destroy(state, pooled, actions);
                    }
                }
            }
        });
    }
}

impl<F: Factory> Drop for PoolShared<F> {
    fn drop(&mut self) {
        if let Some(task) = self.state.get_mut().evictor_task.take() {
            task.abort();
        }
    }
}

/// Removes a queued request if `acquire` is cancelled or times out.
struct QueuedRequest<'a, F: Factory> {
    shared: &'a Arc<PoolShared<F>>,
    handle: Option<QueueHandle>,
}

impl<F: Factory> QueuedRequest<'_, F> {
    fn withdraw(&mut self, error: PoolError) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.shared.with_state(|state, _| {
            if let Some(mut request) = state.waiting.remove(handle) {
                if matches!(error, PoolError::AcquireTimeout { .. }) {
                    state.metrics.acquire_timeouts += 1;
                }
                tracing::debug!(pool_id = self.shared.id, %error, "resource request withdrawn");
                request.reject(error);
            }
        });
    }
}

impl<F: Factory> Drop for QueuedRequest<'_, F> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let cancelled = self
                .shared
                .with_state(|state, _| state.waiting.remove(handle));
            if cancelled.is_some() {
                tracing::trace!(pool_id = self.shared.id, "resource request cancelled");
            }
        }
    }
}

fn spawn<Fut>(future: Fut) -> Option<JoinHandle<()>>
where
    Fut: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => Some(handle.spawn(future)),
        Err(_) => {
            tracing::warn!("no Tokio runtime available; pool task not started");
            None
        }
    }
}

/// A resource checked out of a [`Pool`].
///
/// Dereferences to the resource. Hand it back with [`Pool::release`] or
/// [`Pool::destroy`]; if it is dropped instead, the resource is returned to
/// the pool that lent it.
pub struct Lease<F: Factory> {
    id: ResourceId,
    resource: Option<F::Resource>,
    created_at: Instant,
    pool: Arc<PoolShared<F>>,
}

impl<F: Factory> Lease<F> {
    /// Id of the leased resource, stable across loans.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// When the factory created the resource.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Age of the resource.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl<F: Factory> Deref for Lease<F> {
    type Target = F::Resource;

    // The resource is only taken by release/destroy/drop, which consume the lease.
    #[allow(clippy::expect_used)]
    fn deref(&self) -> &Self::Target {
        self.resource
            .as_ref()
            .expect("lease used after return to pool")
    }
}

impl<F: Factory> DerefMut for Lease<F> {
    #[allow(clippy::expect_used)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource
            .as_mut()
            .expect("lease used after return to pool")
    }
}

impl<F: Factory> Drop for Lease<F> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            tracing::trace!(
                pool_id = self.pool.id,
                resource_id = %self.id,
                "returning dropped lease to pool"
            );
            match self.pool.return_resource(self.id, resource) {
                Ok(Some(pooled)) => {
                    if spawn(Arc::clone(&self.pool).destroy_resource(pooled)).is_none() {
                        self.pool.abandon(|state| state.destroying -= 1);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        resource_id = %self.id,
                        error = %error,
                        "dropped lease was not on loan"
                    );
                }
            }
        }
    }
}

impl<F: Factory> fmt::Debug for Lease<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("pool_id", &self.pool.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Builder for creating a pool.
///
/// # Example
///
/// ```rust,ignore
/// let pool = Pool::builder()
///     .min(2)
///     .max(16)
///     .acquire_timeout(Duration::from_secs(5))
///     .build(factory);
/// ```
pub struct PoolBuilder {
    pool_config: PoolConfig,
    evictor: Box<dyn Evictor>,
}

impl PoolBuilder {
    /// Create a new pool builder with default settings.
    pub fn new() -> Self {
        Self {
            pool_config: PoolConfig::default(),
            evictor: Box::new(DefaultEvictor),
        }
    }

    /// Set the pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Set the minimum number of resources.
    #[must_use]
    pub fn min(mut self, count: usize) -> Self {
        self.pool_config.min = count;
        self
    }

    /// Set the maximum number of resources.
    #[must_use]
    pub fn max(mut self, count: usize) -> Self {
        self.pool_config.max = count;
        self
    }

    /// Set the acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.acquire_timeout = Some(timeout);
        self
    }

    /// Set the hard idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.idle_timeout = timeout;
        self
    }

    /// Enable or disable validation before handout.
    #[must_use]
    pub fn test_on_borrow(mut self, enabled: bool) -> Self {
        self.pool_config.test_on_borrow = enabled;
        self
    }

    /// Use a custom eviction policy.
    #[must_use]
    pub fn evictor(mut self, evictor: impl Evictor + 'static) -> Self {
        self.evictor = Box::new(evictor);
        self
    }

    /// Build the pool.
    pub fn build<F: Factory>(self, factory: F) -> Pool<F> {
        Pool::with_evictor(factory, self.pool_config, self.evictor)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PoolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("pool_config", &self.pool_config)
            .field("evictor", &self.evictor)
            .finish()
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// All resources, including those being created.
    pub size: usize,
    /// Idle resources.
    pub available: usize,
    /// Resources on loan.
    pub borrowed: usize,
    /// Waiting requests.
    pub pending: usize,
    /// Configured minimum.
    pub min: usize,
    /// Configured maximum.
    pub max: usize,
}

impl PoolStatus {
    /// Calculate the utilization percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (self.borrowed as f64 / self.max as f64) * 100.0
    }

    /// Check if the pool is at capacity.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.size >= self.max
    }
}

/// Metrics collected from the pool.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Resources the factory created.
    pub resources_created: u64,
    /// Resources the factory destroyed successfully.
    pub resources_destroyed: u64,
    /// Failed factory `create` calls.
    pub create_failures: u64,
    /// Failed or timed-out factory `destroy` calls.
    pub destroy_failures: u64,
    /// Resources that failed `validate`.
    pub validation_failures: u64,
    /// Resources handed to callers.
    pub acquisitions: u64,
    /// Requests that timed out waiting.
    pub acquire_timeouts: u64,
    /// Resources destroyed by the evictor.
    pub evictions: u64,
    /// Time since pool creation.
    pub uptime: Duration,
}

impl PoolMetrics {
    /// Share of acquire attempts that got a resource (0.0 to 1.0).
    #[must_use]
    pub fn acquire_success_rate(&self) -> f64 {
        let total = self.acquisitions + self.acquire_timeouts;
        if total == 0 {
            return 1.0;
        }
        self.acquisitions as f64 / total as f64
    }

    /// Share of factory `create` calls that succeeded (0.0 to 1.0).
    #[must_use]
    pub fn create_success_rate(&self) -> f64 {
        let total = self.resources_created + self.create_failures;
        if total == 0 {
            return 1.0;
        }
        self.resources_created as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_status_utilization() {
        let status = PoolStatus {
            size: 10,
            available: 5,
            borrowed: 5,
            pending: 0,
            min: 0,
            max: 20,
        };
        assert!((status.utilization() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_status_at_capacity() {
        let status = PoolStatus {
            size: 10,
            available: 0,
            borrowed: 10,
            pending: 3,
            min: 0,
            max: 10,
        };
        assert!(status.is_at_capacity());

        let status = PoolStatus {
            size: 10,
            available: 5,
            borrowed: 5,
            pending: 0,
            min: 0,
            max: 20,
        };
        assert!(!status.is_at_capacity());
    }

    #[test]
    fn test_pool_metrics_success_rates() {
        let metrics = PoolMetrics {
            resources_created: 19,
            resources_destroyed: 2,
            create_failures: 1,
            destroy_failures: 0,
            validation_failures: 0,
            acquisitions: 90,
            acquire_timeouts: 10,
            evictions: 0,
            uptime: Duration::from_secs(3600),
        };

        assert!((metrics.acquire_success_rate() - 0.9).abs() < f64::EPSILON);
        assert!((metrics.create_success_rate() - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builder_fluent() {
        let builder = Pool::<NeverFactory>::builder()
            .min(5)
            .max(50)
            .test_on_borrow(true);

        assert_eq!(builder.pool_config.min, 5);
        assert_eq!(builder.pool_config.max, 50);
        assert!(builder.pool_config.test_on_borrow);
    }

    #[test]
    fn test_creations_without_runtime_are_not_counted() {
        let pool = Pool::new(NeverFactory, PoolConfig::new().min(2).max(3));

        assert!(pool.is_started());
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.spare_resource_capacity(), 3);
    }

    struct NeverFactory;

    #[async_trait::async_trait]
    impl Factory for NeverFactory {
        type Resource = ();
        type Error = std::io::Error;

        async fn create(&self) -> Result<(), std::io::Error> {
            Err(std::io::Error::other("never"))
        }

        async fn destroy(&self, _resource: ()) -> Result<(), std::io::Error> {
            Ok(())
        }
    }
}
