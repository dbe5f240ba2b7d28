//! The driver seam.

use async_trait::async_trait;
use sqltag_template::Value;

use crate::row::Row;

/// A live database connection that can run a compiled query.
///
/// Drivers implement this for their connection type and a
/// [`Factory`](sqltag_pool::Factory) that creates it.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Driver failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run `sql` with positional `params` and collect the result rows.
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Self::Error>;

    /// Run a statement and return the number of affected rows.
    ///
    /// The default runs [`query`](Connection::query) and counts the rows it
    /// returns.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, Self::Error> {
        let rows = self.query(sql, params).await?;
        Ok(rows.len() as u64)
    }
}
