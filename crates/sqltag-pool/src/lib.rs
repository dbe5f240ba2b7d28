//! # sqltag-pool
//!
//! Generic asynchronous resource pool.
//!
//! The pool manages any resource a [`Factory`] can create and destroy:
//! database connections, sockets, worker handles. It keeps between `min` and
//! `max` resources alive, queues callers by priority when it is exhausted,
//! and evicts resources that sit idle for too long.
//!
//! ## Features
//!
//! - Priority-ordered waiting queue with optional length cap
//! - LIFO or FIFO handout of idle resources
//! - Optional validation before handout (`test_on_borrow`)
//! - Acquire and destroy timeouts
//! - Soft and hard idle eviction with a pluggable [`Evictor`]
//! - Graceful `drain` and `clear`
//! - [`RecyclingPool`] retiring resources past a maximum age
//! - Status snapshot and metrics for observability
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqltag_pool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! let pool = Pool::builder()
//!     .min(2)
//!     .max(20)
//!     .idle_timeout(Duration::from_secs(300))
//!     .build(factory);
//!
//! // Get a resource from the pool
//! let mut conn = pool.acquire().await?;
//! conn.execute("SELECT 1").await?;
//! pool.release(conn).await?;
//!
//! // Or let the pool release/destroy it based on the outcome
//! let rows = pool.use_resource(0, async |conn| conn.query("SELECT 1").await).await?;
//!
//! // Check pool status
//! let status = pool.status();
//! println!("Pool utilization: {:.1}%", status.utilization());
//!
//! // Shut down
//! pool.drain().await;
//! pool.clear().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod deferred;
pub mod deque;
pub mod error;
pub mod evictor;
pub mod factory;
pub mod pool;
pub mod priority_queue;
pub mod recycling;
pub mod resource;

pub use config::{PoolConfig, PoolOptions};
pub use deferred::{Deferred, DeferredState};
pub use error::PoolError;
pub use evictor::{DefaultEvictor, EvictionConfig, Evictor};
pub use factory::Factory;
pub use pool::{Lease, Pool, PoolBuilder, PoolMetrics, PoolStatus};
pub use recycling::{RecyclingConfig, RecyclingPool};
pub use resource::{PooledResource, ResourceId, ResourceLoan, ResourceState};
