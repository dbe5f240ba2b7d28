//! Shared fixtures for the pool integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqltag_pool::Factory;

/// A fake connection handed out by [`TestFactory`].
#[derive(Debug)]
pub struct Conn {
    pub id: usize,
    pub healthy: bool,
}

#[derive(Debug, Default)]
pub struct Stats {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub failures_left: AtomicUsize,
}

impl Stats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestFactory {
    pub stats: Arc<Stats>,
    pub create_delay: Duration,
    pub destroy_delay: Duration,
}

impl TestFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` creations.
    pub fn failing(count: usize) -> Self {
        let factory = Self::default();
        factory.stats.failures_left.store(count, Ordering::SeqCst);
        factory
    }

    pub fn slow_create(delay: Duration) -> Self {
        Self {
            create_delay: delay,
            ..Self::default()
        }
    }

    pub fn slow_destroy(delay: Duration) -> Self {
        Self {
            destroy_delay: delay,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Factory for TestFactory {
    type Resource = Conn;
    type Error = io::Error;

    async fn create(&self) -> Result<Conn, io::Error> {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        let decrement = |left: usize| left.checked_sub(1);
        let refused = self
            .stats
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, decrement)
            .is_ok();
        if refused {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        let id = self.stats.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Conn { id, healthy: true })
    }

    async fn destroy(&self, _conn: Conn) -> Result<(), io::Error> {
        if !self.destroy_delay.is_zero() {
            tokio::time::sleep(self.destroy_delay).await;
        }
        self.stats.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn validate(&self, conn: &mut Conn) -> bool {
        conn.healthy
    }
}

/// Let spawned pool tasks run. Tests use a paused clock, so this returns as
/// soon as every other task is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
