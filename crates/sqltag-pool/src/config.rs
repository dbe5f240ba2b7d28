//! Pool configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::PoolError;

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Resources the pool keeps alive even when idle.
    pub min: usize,

    /// Upper bound on resources, including those being created.
    pub max: usize,

    /// Cap on queued requests once the pool is exhausted. `None` is unbounded.
    pub max_waiting_clients: Option<usize>,

    /// Run the factory's `validate` before handing a resource out.
    pub test_on_borrow: bool,

    /// How long `acquire` waits before failing. `None` waits forever.
    pub acquire_timeout: Option<Duration>,

    /// How long a factory `destroy` may take before the pool stops tracking it.
    pub destroy_timeout: Option<Duration>,

    /// Hand out the longest-idle resource first instead of the most recent.
    pub fifo: bool,

    /// Number of priority slots for waiting requests.
    pub priority_range: usize,

    /// Start the pool (evictor, minimum size) on construction.
    pub autostart: bool,

    /// Interval between eviction runs. Zero disables eviction.
    pub eviction_run_interval: Duration,

    /// Idle resources examined per eviction run.
    pub num_tests_per_eviction_run: usize,

    /// Idle time after which a resource is evicted while the pool is above `min`.
    pub soft_idle_timeout: Option<Duration>,

    /// Idle time after which a resource is evicted unconditionally.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 10,
            max_waiting_clients: None,
            test_on_borrow: false,
            acquire_timeout: None,
            destroy_timeout: None,
            fifo: false,
            priority_range: 1,
            autostart: true,
            eviction_run_interval: Duration::ZERO,
            num_tests_per_eviction_run: 3,
            soft_idle_timeout: None,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON form of [`PoolOptions`].
    pub fn from_json(json: &str) -> Result<Self, PoolError> {
        match serde_json::from_str::<PoolOptions>(json) {
            Ok(options) => Ok(options.into()),
            Err(error) => Err(PoolError::Config(error.to_string())),
        }
    }

    /// Clamp sizes so that `1 <= max` and `min <= max`, with at least one
    /// priority slot.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max = self.max.max(1);
        self.min = self.min.min(self.max);
        self.priority_range = self.priority_range.max(1);
        self
    }

    /// Set the minimum pool size.
    #[must_use]
    pub fn min(mut self, count: usize) -> Self {
        self.min = count;
        self
    }

    /// Set the maximum pool size.
    #[must_use]
    pub fn max(mut self, count: usize) -> Self {
        self.max = count;
        self
    }

    /// Limit the waiting queue.
    #[must_use]
    pub fn max_waiting_clients(mut self, count: usize) -> Self {
        self.max_waiting_clients = Some(count);
        self
    }

    /// Enable or disable validation before handout.
    #[must_use]
    pub fn test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }

    /// Set the acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Set the destroy timeout.
    #[must_use]
    pub fn destroy_timeout(mut self, timeout: Duration) -> Self {
        self.destroy_timeout = Some(timeout);
        self
    }

    /// Choose FIFO (`true`) or LIFO (`false`) handout of idle resources.
    #[must_use]
    pub fn fifo(mut self, enabled: bool) -> Self {
        self.fifo = enabled;
        self
    }

    /// Set the number of priority slots.
    #[must_use]
    pub fn priority_range(mut self, slots: usize) -> Self {
        self.priority_range = slots;
        self
    }

    /// Enable or disable starting on construction.
    #[must_use]
    pub fn autostart(mut self, enabled: bool) -> Self {
        self.autostart = enabled;
        self
    }

    /// Set the eviction interval.
    #[must_use]
    pub fn eviction_run_interval(mut self, interval: Duration) -> Self {
        self.eviction_run_interval = interval;
        self
    }

    /// Set how many idle resources each eviction run examines.
    #[must_use]
    pub fn num_tests_per_eviction_run(mut self, count: usize) -> Self {
        self.num_tests_per_eviction_run = count;
        self
    }

    /// Set the soft idle timeout.
    #[must_use]
    pub fn soft_idle_timeout(mut self, timeout: Duration) -> Self {
        self.soft_idle_timeout = Some(timeout);
        self
    }

    /// Set the hard idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

/// Serializable pool options using the conventional option names
/// (`acquireTimeoutMillis`, `softIdleTimeoutMillis`, ...).
///
/// Absent fields keep their [`PoolConfig::default`] value. A negative
/// `softIdleTimeoutMillis` disables soft eviction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolOptions {
    /// See [`PoolConfig::min`].
    pub min: Option<usize>,
    /// See [`PoolConfig::max`].
    pub max: Option<usize>,
    /// See [`PoolConfig::max_waiting_clients`].
    pub max_waiting_clients: Option<usize>,
    /// See [`PoolConfig::test_on_borrow`].
    pub test_on_borrow: Option<bool>,
    /// Acquire timeout in milliseconds.
    pub acquire_timeout_millis: Option<u64>,
    /// Destroy timeout in milliseconds.
    pub destroy_timeout_millis: Option<u64>,
    /// See [`PoolConfig::fifo`].
    pub fifo: Option<bool>,
    /// See [`PoolConfig::priority_range`].
    pub priority_range: Option<usize>,
    /// See [`PoolConfig::autostart`].
    pub autostart: Option<bool>,
    /// Eviction interval in milliseconds.
    pub eviction_run_interval_millis: Option<u64>,
    /// See [`PoolConfig::num_tests_per_eviction_run`].
    pub num_tests_per_eviction_run: Option<usize>,
    /// Soft idle timeout in milliseconds.
    pub soft_idle_timeout_millis: Option<i64>,
    /// Hard idle timeout in milliseconds.
    pub idle_timeout_millis: Option<u64>,
    /// Recycle timeout in milliseconds, used by
    /// [`RecyclingPool`](crate::RecyclingPool).
    pub recycle_timeout: Option<u64>,
    /// Recycle jitter in milliseconds.
    pub recycle_jitter: Option<u64>,
}

impl From<PoolOptions> for PoolConfig {
    fn from(options: PoolOptions) -> Self {
        let defaults = PoolConfig::default();
        Self {
            min: options.min.unwrap_or(defaults.min),
            max: options.max.unwrap_or(defaults.max),
            max_waiting_clients: options.max_waiting_clients,
            test_on_borrow: options.test_on_borrow.unwrap_or(defaults.test_on_borrow),
            acquire_timeout: options.acquire_timeout_millis.map(Duration::from_millis),
            destroy_timeout: options.destroy_timeout_millis.map(Duration::from_millis),
            fifo: options.fifo.unwrap_or(defaults.fifo),
            priority_range: options.priority_range.unwrap_or(defaults.priority_range),
            autostart: options.autostart.unwrap_or(defaults.autostart),
            eviction_run_interval: options
                .eviction_run_interval_millis
                .map_or(defaults.eviction_run_interval, Duration::from_millis),
            num_tests_per_eviction_run: options
                .num_tests_per_eviction_run
                .unwrap_or(defaults.num_tests_per_eviction_run),
            soft_idle_timeout: options
                .soft_idle_timeout_millis
                .and_then(|millis| u64::try_from(millis).ok())
                .map(Duration::from_millis),
            idle_timeout: options
                .idle_timeout_millis
                .map_or(defaults.idle_timeout, Duration::from_millis),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.min, 0);
        assert_eq!(config.max, 10);
        assert!(!config.fifo);
        assert!(config.autostart);
        assert_eq!(config.priority_range, 1);
        assert_eq!(config.num_tests_per_eviction_run, 3);
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert!(config.eviction_run_interval.is_zero());
    }

    #[test]
    fn test_normalized_clamps_sizes() {
        let config = PoolConfig::new()
            .min(5)
            .max(0)
            .priority_range(0)
            .normalized();
        assert_eq!(config.max, 1);
        assert_eq!(config.min, 1);
        assert_eq!(config.priority_range, 1);

        let config = PoolConfig::new().min(8).max(4).normalized();
        assert_eq!((config.min, config.max), (4, 4));
    }

    #[test]
    fn test_fluent_setters() {
        let config = PoolConfig::new()
            .min(2)
            .max(6)
            .fifo(true)
            .acquire_timeout(Duration::from_millis(250))
            .soft_idle_timeout(Duration::from_secs(5));

        assert_eq!(config.min, 2);
        assert_eq!(config.max, 6);
        assert!(config.fifo);
        assert_eq!(config.acquire_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.soft_idle_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_from_json_options() {
        let config = PoolConfig::from_json(
            r#"{
                "min": 2,
                "max": 8,
                "maxWaitingClients": 16,
                "testOnBorrow": true,
                "acquireTimeoutMillis": 1500,
                "evictionRunIntervalMillis": 1000,
                "softIdleTimeoutMillis": -1,
                "idleTimeoutMillis": 60000
            }"#,
        )
        .unwrap();

        assert_eq!(config.min, 2);
        assert_eq!(config.max, 8);
        assert_eq!(config.max_waiting_clients, Some(16));
        assert!(config.test_on_borrow);
        assert_eq!(config.acquire_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.eviction_run_interval, Duration::from_secs(1));
        assert_eq!(config.soft_idle_timeout, None);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert!(!config.fifo);
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        let err = PoolConfig::from_json(r#"{"max": "lots"}"#).unwrap_err();
        assert!(matches!(err, PoolError::Config(_)));
    }
}
