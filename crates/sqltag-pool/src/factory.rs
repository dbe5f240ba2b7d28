//! The resource factory contract.

use async_trait::async_trait;

/// Creates, destroys and optionally validates the resources a pool manages.
///
/// Errors from any of these operations are logged by the pool and never
/// reach callers of [`Pool::acquire`](crate::Pool::acquire).
///
/// # Example
///
/// ```rust,ignore
/// struct PgFactory { config: tokio_postgres::Config }
///
/// #[async_trait]
/// impl Factory for PgFactory {
///     type Resource = tokio_postgres::Client;
///     type Error = tokio_postgres::Error;
///
///     async fn create(&self) -> Result<Self::Resource, Self::Error> {
///         let (client, connection) = self.config.connect(NoTls).await?;
///         tokio::spawn(connection);
///         Ok(client)
///     }
///
///     async fn destroy(&self, _client: Self::Resource) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     async fn validate(&self, client: &mut Self::Resource) -> bool {
///         client.simple_query("SELECT 1").await.is_ok()
///     }
/// }
/// ```
#[async_trait]
pub trait Factory: Send + Sync + 'static {
    /// The pooled resource.
    type Resource: Send + 'static;

    /// Failure type of `create` and `destroy`.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Produce a new resource.
    async fn create(&self) -> Result<Self::Resource, Self::Error>;

    /// Dispose of a resource the pool no longer wants.
    async fn destroy(&self, resource: Self::Resource) -> Result<(), Self::Error>;

    /// Check a resource before it is handed out. Only called when
    /// `test_on_borrow` is enabled.
    async fn validate(&self, resource: &mut Self::Resource) -> bool {
        let _ = resource;
        true
    }
}
