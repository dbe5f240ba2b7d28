//! Template-to-pool glue.

use sqltag_pool::{Factory, Pool};
use sqltag_template::{CompiledQuery, Dialect, Sql};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::row::Row;

/// A pooled database that runs [`Sql`] templates.
///
/// Each call compiles the template against the configured dialect, leases a
/// connection, runs the query and hands the connection back. A connection
/// whose query failed is destroyed rather than reused.
pub struct Database<F>
where
    F: Factory,
    F::Resource: Connection,
{
    pool: Pool<F>,
    dialect: Box<dyn Dialect>,
}

impl<F> Database<F>
where
    F: Factory,
    F::Resource: Connection,
{
    /// Wrap a pool with the dialect its connections speak.
    ///
    /// Accepts a [`Pool`] or a [`RecyclingPool`](sqltag_pool::RecyclingPool).
    pub fn new(pool: impl Into<Pool<F>>, dialect: impl Dialect + 'static) -> Self {
        Self {
            pool: pool.into(),
            dialect: Box::new(dialect),
        }
    }

    /// Compile without running.
    pub fn compile(&self, sql: &Sql) -> Result<CompiledQuery> {
        Ok(sql.to_sql(self.dialect.as_ref())?)
    }

    /// Run a query at the highest priority.
    pub async fn query(&self, sql: &Sql) -> Result<Vec<Row>> {
        self.query_with_priority(sql, 0).await
    }

    /// Run a query, waiting for a connection at `priority`.
    pub async fn query_with_priority(&self, sql: &Sql, priority: usize) -> Result<Vec<Row>> {
        let compiled = self.compile(sql)?;
        tracing::debug!(
            dialect = self.dialect.name(),
            params = compiled.params.len(),
            priority,
            "running query"
        );

        self.pool
            .use_resource(priority, async |conn: &mut F::Resource| {
                conn.query(&compiled.query, &compiled.params)
                    .await
                    .map_err(Error::connection)
            })
            .await
    }

    /// Run a query and return its first row, if any.
    pub async fn query_one(&self, sql: &Sql) -> Result<Option<Row>> {
        Ok(self.query(sql).await?.into_iter().next())
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&self, sql: &Sql) -> Result<u64> {
        let compiled = self.compile(sql)?;
        tracing::debug!(
            dialect = self.dialect.name(),
            params = compiled.params.len(),
            "executing statement"
        );

        self.pool
            .use_resource(0, async |conn: &mut F::Resource| {
                conn.execute(&compiled.query, &compiled.params)
                    .await
                    .map_err(Error::connection)
            })
            .await
    }

    /// The underlying pool.
    pub fn pool(&self) -> &Pool<F> {
        &self.pool
    }

    /// The configured dialect.
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }
}

impl<F> std::fmt::Debug for Database<F>
where
    F: Factory,
    F::Resource: Connection,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.dialect.name())
            .field("pool", &self.pool.status())
            .finish()
    }
}
