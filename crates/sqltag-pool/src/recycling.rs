//! A pool that retires resources once they reach a maximum age.

use std::ops::Deref;
use std::time::Duration;

use rand::Rng;

use crate::config::{PoolConfig, PoolOptions};
use crate::factory::Factory;
use crate::pool::Pool;

/// Age limits for [`RecyclingPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecyclingConfig {
    /// Resources older than this are destroyed on release. `None` disables
    /// recycling.
    pub recycle_timeout: Option<Duration>,
    /// Upper bound of a random amount subtracted from `recycle_timeout` per
    /// release, so resources created together are not all retired together.
    pub recycle_jitter: Duration,
}

impl RecyclingConfig {
    /// Create a config retiring resources after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            recycle_timeout: Some(timeout),
            recycle_jitter: Duration::ZERO,
        }
    }

    /// Set the jitter.
    #[must_use]
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.recycle_jitter = jitter;
        self
    }

    /// The effective age limit for one release, with a fresh jitter sample.
    fn threshold(&self, timeout: Duration) -> Duration {
        if self.recycle_jitter.is_zero() {
            return timeout;
        }
        let fraction: f64 = rand::thread_rng().r#gen();
        timeout.saturating_sub(self.recycle_jitter.mul_f64(fraction))
    }

    /// Whether a resource of `age` is past its recycle age.
    pub(crate) fn is_due(&self, age: Duration) -> bool {
        self.recycle_timeout
            .is_some_and(|timeout| age >= self.threshold(timeout))
    }
}

impl From<&PoolOptions> for RecyclingConfig {
    fn from(options: &PoolOptions) -> Self {
        Self {
            recycle_timeout: options.recycle_timeout.map(Duration::from_millis),
            recycle_jitter: options
                .recycle_jitter
                .map_or(Duration::ZERO, Duration::from_millis),
        }
    }
}

/// A [`Pool`] that destroys resources past their recycle age when they come
/// back, instead of keeping them.
///
/// The check runs on every return path: [`Pool::release`],
/// [`Pool::use_resource`] and a dropped [`Lease`](crate::Lease). It never
/// shrinks the pool below `min`. Everything else behaves like the wrapped
/// pool, which is reachable through `Deref`.
#[derive(Debug)]
pub struct RecyclingPool<F: Factory> {
    pool: Pool<F>,
    config: RecyclingConfig,
}

impl<F: Factory> Clone for RecyclingPool<F> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            config: self.config,
        }
    }
}

impl<F: Factory> RecyclingPool<F> {
    /// Create a recycling pool with the default eviction policy.
    pub fn new(factory: F, pool_config: PoolConfig, config: RecyclingConfig) -> Self {
        Self::from_pool(Pool::new(factory, pool_config), config)
    }

    /// Wrap an existing pool.
    ///
    /// Recycling is installed in the pool itself, so it also applies to
    /// clones of `pool` and to the [`Pool`] this converts back into.
    pub fn from_pool(pool: Pool<F>, config: RecyclingConfig) -> Self {
        pool.set_recycling(config);
        tracing::debug!(
            recycle_timeout = ?config.recycle_timeout,
            recycle_jitter = ?config.recycle_jitter,
            "recycling enabled"
        );
        Self { pool, config }
    }

    /// Build both configs from one set of options.
    pub fn from_options(factory: F, options: PoolOptions) -> Self {
        let config = RecyclingConfig::from(&options);
        Self::new(factory, options.into(), config)
    }

    /// The recycling limits.
    #[must_use]
    pub fn recycling_config(&self) -> &RecyclingConfig {
        &self.config
    }

    /// The wrapped pool.
    #[must_use]
    pub fn inner(&self) -> &Pool<F> {
        &self.pool
    }
}

impl<F: Factory> From<RecyclingPool<F>> for Pool<F> {
    fn from(pool: RecyclingPool<F>) -> Self {
        pool.pool
    }
}

impl<F: Factory> Deref for RecyclingPool<F> {
    type Target = Pool<F>;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
