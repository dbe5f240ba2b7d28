//! # sqltag-client
//!
//! Runs [`Sql`] templates through a pool of database connections.
//!
//! A driver supplies a [`Connection`] implementation and a
//! [`Factory`](sqltag_pool::Factory) that opens it. [`Database`] then
//! compiles each template for the driver's [`Dialect`], leases a pooled
//! connection and returns the result as [`Row`]s.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqltag_client::{Database, Postgres, sql};
//! use sqltag_pool::{Pool, PoolConfig};
//!
//! let pool = Pool::new(PgFactory::new(url), PoolConfig::new().max(10));
//! pool.ready().await;
//! let db = Database::new(pool, Postgres);
//!
//! let rows = db.query(&sql!("select * from users where id = {}", 7)?).await?;
//! for row in rows {
//!     let name: String = row.get_by_name("name")?;
//!     println!("User: {name}");
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod database;
pub mod error;
pub mod row;

pub use connection::Connection;
pub use database::Database;
pub use error::{Error, Result};
pub use row::{FromValue, Row};
pub use sqltag_template::{
    Dialect, Mssql, MySql, Postgres, Sql, Sqlite, Value, identifier, raw, row, sql, values,
};
