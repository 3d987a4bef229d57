use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::config::PoolOptions;
use crate::engine::Engine;
use crate::error::SqlBridgeError;
use crate::pool::{Lease, PoolCore};
use crate::results::{FromArrayRow, FromRow};
use crate::stream::RowStream;
use crate::traits::{
    Connectable, PoolConnection, Poolable, Queriable, Transactionable, run_managed,
};
use crate::wrappers::ClientSlot;

use super::config::{SharedSqliteConnection, SqliteConnectionOptions, SqliteManager};
use super::macros::impl_sqlite_queriable;
use super::query;
use super::transaction::{SqliteBeginOptions, SqliteTransaction};
use super::{Sqlite, SqliteExtension, SqliteParam};

/// A bb8 pool of `SQLite` connections.
///
/// Every pooled connection opens the same database, so use a file path (or a shared-cache
/// URI) rather than `:memory:` when connections must see each other's writes.
pub struct SqlitePool {
    core: PoolCore<SqliteManager>,
}

impl SqlitePool {
    #[must_use]
    pub fn new(url: impl Into<String>, options: PoolOptions<SqliteConnectionOptions>) -> Self {
        Self {
            core: PoolCore::new(Sqlite::NAME, url.into(), options),
        }
    }

    async fn lease(&self) -> Result<(SharedSqliteConnection, Lease<SqliteManager>), SqlBridgeError> {
        let lease = self.core.lease().await?;
        Ok((Arc::clone(&*lease), lease))
    }

    /// Begin a transaction on a freshly acquired connection. The connection returns to the
    /// pool when the transaction is dropped.
    ///
    /// # Errors
    ///
    /// `NotConnected` before `connect()`, otherwise pool or native errors.
    pub async fn begin_transaction(
        &self,
        options: SqliteBeginOptions,
    ) -> Result<SqliteTransaction<'static>, SqlBridgeError> {
        let (shared, lease) = self.lease().await?;
        SqliteTransaction::begin(shared, Some(lease), options).await
    }

    /// Run `f` in a managed transaction on a connection acquired for the call.
    ///
    /// # Errors
    ///
    /// The error of `f`, or pool and native errors.
    pub async fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut SqliteTransaction<'static>) -> BoxFuture<'c, Result<T, E>>
            + Send,
        T: Send,
        E: From<SqlBridgeError> + std::error::Error + Send + Sync + 'static,
    {
        let tx = self.begin_transaction(SqliteBeginOptions::default()).await?;
        run_managed(tx, f).await
    }
}

impl fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlitePool")
            .field("url", &self.core.url())
            .field("pool_size", &self.core.pool_size())
            .field("connected", &self.core.is_connected())
            .finish()
    }
}

#[async_trait]
impl Connectable for SqlitePool {
    type Options = PoolOptions<SqliteConnectionOptions>;

    fn connection_url(&self) -> &str {
        self.core.url()
    }

    fn connection_options(&self) -> &PoolOptions<SqliteConnectionOptions> {
        self.core.options()
    }

    fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    async fn connect(&mut self) -> Result<(), SqlBridgeError> {
        self.core.connect().await
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        self.core.close();
        Ok(())
    }
}

/// Each call checks a connection out and returns it when the call finishes, on every path.
#[async_trait]
impl Queriable for SqlitePool {
    type Engine = Sqlite;

    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqliteParam],
    ) -> Result<Option<u64>, SqlBridgeError> {
        let (shared, _lease) = self.lease().await?;
        query::execute(shared, sql, params).await
    }

    async fn query<T>(&mut self, sql: &str, params: &[SqliteParam]) -> Result<Vec<T>, SqlBridgeError>
    where
        T: FromRow<SqliteExtension> + Send,
    {
        let (shared, _lease) = self.lease().await?;
        query::fetch_rows(shared, sql, params, None)
            .await?
            .into_iter()
            .map(T::from_row)
            .collect()
    }

    async fn query_one<T>(
        &mut self,
        sql: &str,
        params: &[SqliteParam],
    ) -> Result<Option<T>, SqlBridgeError>
    where
        T: FromRow<SqliteExtension> + Send,
    {
        let (shared, _lease) = self.lease().await?;
        query::fetch_rows(shared, sql, params, Some(1))
            .await?
            .into_iter()
            .next()
            .map(T::from_row)
            .transpose()
    }

    /// The checked-out connection stays with the stream until it is dropped.
    async fn query_many<'a, T>(
        &'a mut self,
        sql: &'a str,
        params: &'a [SqliteParam],
    ) -> Result<RowStream<'a, T>, SqlBridgeError>
    where
        T: FromRow<SqliteExtension> + Send + 'a,
    {
        let (shared, lease) = self.lease().await?;
        let rows = query::stream_rows(shared, sql, params);
        Ok(query::convert_stream(rows, move |row| {
            let _held = &lease;
            T::from_row(row)
        }))
    }

    async fn query_array<T>(
        &mut self,
        sql: &str,
        params: &[SqliteParam],
    ) -> Result<Vec<T>, SqlBridgeError>
    where
        T: FromArrayRow<SqliteExtension> + Send,
    {
        let (shared, _lease) = self.lease().await?;
        query::fetch_array_rows(shared, sql, params, None)
            .await?
            .into_iter()
            .map(T::from_array_row)
            .collect()
    }

    async fn query_one_array<T>(
        &mut self,
        sql: &str,
        params: &[SqliteParam],
    ) -> Result<Option<T>, SqlBridgeError>
    where
        T: FromArrayRow<SqliteExtension> + Send,
    {
        let (shared, _lease) = self.lease().await?;
        query::fetch_array_rows(shared, sql, params, Some(1))
            .await?
            .into_iter()
            .next()
            .map(T::from_array_row)
            .transpose()
    }
}

#[async_trait]
impl Poolable for SqlitePool {
    type Connection = SqlitePoolConnection;

    fn pool_size(&self) -> usize {
        self.core.pool_size()
    }

    async fn acquire(&self) -> Result<SqlitePoolConnection, SqlBridgeError> {
        let lease = self.core.lease().await?;
        tracing::debug!(engine = Sqlite::NAME, "connection acquired");
        Ok(SqlitePoolConnection {
            lease: ClientSlot::occupied(Sqlite::NAME, lease),
        })
    }
}

/// A `SQLite` connection checked out of a [`SqlitePool`]. Returned to the pool on `release()`
/// or drop.
pub struct SqlitePoolConnection {
    lease: ClientSlot<Lease<SqliteManager>>,
}

impl SqlitePoolConnection {
    fn shared(&self) -> Result<SharedSqliteConnection, SqlBridgeError> {
        self.lease.get().map(|lease| Arc::clone(&**lease))
    }
}

impl fmt::Debug for SqlitePoolConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlitePoolConnection")
            .field("released", &!self.lease.is_set())
            .finish()
    }
}

impl_sqlite_queriable!(SqlitePoolConnection);

#[async_trait]
impl Transactionable for SqlitePoolConnection {
    type Transaction<'t>
        = SqliteTransaction<'t>
    where
        Self: 't;

    async fn begin_transaction<'t>(
        &'t mut self,
        options: SqliteBeginOptions,
    ) -> Result<SqliteTransaction<'t>, SqlBridgeError> {
        SqliteTransaction::begin(self.shared()?, None, options).await
    }
}

#[async_trait]
impl PoolConnection for SqlitePoolConnection {
    fn is_released(&self) -> bool {
        !self.lease.is_set()
    }

    async fn release(&mut self) -> Result<(), SqlBridgeError> {
        if self.lease.take().is_some() {
            tracing::debug!(engine = Sqlite::NAME, "connection released");
        }
        Ok(())
    }
}
