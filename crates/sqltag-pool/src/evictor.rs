//! Idle eviction policy.

use std::fmt;
use std::time::Duration;

/// Thresholds an [`Evictor`] decides against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionConfig {
    /// Evict past this idle time, but only while the pool is above `min`.
    pub soft_idle_timeout: Option<Duration>,
    /// Evict past this idle time regardless of `min`.
    pub idle_timeout: Duration,
    /// Configured minimum pool size.
    pub min: usize,
}

/// Decides whether an idle resource should be destroyed.
pub trait Evictor: Send + Sync + fmt::Debug {
    /// `idle_time` is how long the resource has been available, and
    /// `available` how many resources are currently available.
    fn evict(&self, config: &EvictionConfig, idle_time: Duration, available: usize) -> bool;
}

/// The standard soft/hard idle timeout policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEvictor;

impl Evictor for DefaultEvictor {
    fn evict(&self, config: &EvictionConfig, idle_time: Duration, available: usize) -> bool {
        let soft_expired = config
            .soft_idle_timeout
            .is_some_and(|soft| !soft.is_zero() && soft < idle_time && config.min < available);
        soft_expired || config.idle_timeout < idle_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(soft: Option<u64>, hard: u64, min: usize) -> EvictionConfig {
        EvictionConfig {
            soft_idle_timeout: soft.map(Duration::from_millis),
            idle_timeout: Duration::from_millis(hard),
            min,
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_hard_timeout_ignores_min() {
        let evictor = DefaultEvictor;
        let config = config(None, 1_000, 5);
        assert!(evictor.evict(&config, ms(1_001), 1));
        assert!(!evictor.evict(&config, ms(1_000), 1));
    }

    #[test]
    fn test_soft_timeout_respects_min() {
        let evictor = DefaultEvictor;
        let config = config(Some(100), 1_000, 2);
        assert!(evictor.evict(&config, ms(200), 3));
        assert!(!evictor.evict(&config, ms(200), 2));
        assert!(!evictor.evict(&config, ms(100), 3));
    }

    #[test]
    fn test_zero_soft_timeout_is_disabled() {
        let evictor = DefaultEvictor;
        let config = config(Some(0), 1_000, 0);
        assert!(!evictor.evict(&config, ms(500), 10));
    }
}
