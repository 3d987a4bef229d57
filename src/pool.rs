//! Pool scaffolding shared by the engine pools.
//!
//! Slot management belongs to `bb8`; this layer only binds the pool lazily and hands out
//! owned leases.

use bb8::{ManageConnection, Pool, PooledConnection};

use crate::config::PoolOptions;
use crate::error::SqlBridgeError;
use crate::wrappers::ClientSlot;

/// A pooled native connection, returned to its pool on drop.
pub type Lease<M> = PooledConnection<'static, M>;

pub struct PoolCore<M: PoolManager> {
    url: String,
    options: PoolOptions<M::Options>,
    pool: ClientSlot<Pool<M>>,
}

/// Managers that can be rebuilt from a URL and connection options at `connect()` time.
pub trait PoolManager: ManageConnection {
    type Options: Send + Sync;

    /// # Errors
    ///
    /// Configuration errors for an unusable URL or option set.
    fn from_parts(url: &str, options: &Self::Options) -> Result<Self, SqlBridgeError>;
}

impl<M> PoolCore<M>
where
    M: PoolManager,
    SqlBridgeError: From<M::Error> + From<bb8::RunError<M::Error>>,
{
    pub fn new(engine: &'static str, url: String, options: PoolOptions<M::Options>) -> Self {
        Self {
            url,
            options,
            pool: ClientSlot::empty(engine),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &PoolOptions<M::Options> {
        &self.options
    }

    pub fn pool_size(&self) -> usize {
        self.options.pool_size
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_set()
    }

    pub async fn connect(&mut self) -> Result<(), SqlBridgeError> {
        let engine = self.pool.engine();
        if self.pool.is_set() {
            return Err(SqlBridgeError::AlreadyConnected { engine });
        }
        let max_size = self.options.max_size()?;
        let manager = M::from_parts(&self.url, &self.options.connection)?;
        let mut builder = Pool::builder().max_size(max_size);
        if let Some(timeout) = self.options.acquire_timeout {
            builder = builder.connection_timeout(timeout);
        }
        let pool = builder.build(manager).await?;
        tracing::debug!(engine, max_size, "pool ready");
        self.pool.set(Some(pool));
        Ok(())
    }

    /// Drop the pool handle. Connections still checked out close when their leases drop.
    pub fn close(&mut self) {
        if self.pool.take().is_some() {
            tracing::debug!(engine = self.pool.engine(), "pool closed");
        }
    }

    /// Check out an owned connection, waiting for a free slot.
    pub async fn lease(&self) -> Result<Lease<M>, SqlBridgeError> {
        let pool = self.pool.get()?;
        let lease = pool.get_owned().await?;
        Ok(lease)
    }
}
