use std::fmt;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio_postgres::Client;

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

use super::config::{PgManager, PostgresConnectionOptions};
use super::macros::impl_postgres_queriable;
use super::query;
use super::transaction::{PostgresBeginOptions, PostgresTransaction};
use super::{Postgres, PostgresExtension, PostgresParam};

/// A bb8 pool of PostgreSQL clients.
pub struct PostgresPool {
    core: PoolCore<PgManager>,
}

impl PostgresPool {
    #[must_use]
    pub fn new(url: impl Into<String>, options: PoolOptions<PostgresConnectionOptions>) -> Self {
        Self {
            core: PoolCore::new(Postgres::NAME, url.into(), options),
        }
    }

    /// Run `f` in a managed transaction on a client checked out for the call.
    ///
    /// To keep a transaction open across calls, `acquire()` a connection and begin one on it.
    ///
    /// # Errors
    ///
    /// The error of `f`, or pool and native errors.
    pub async fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: for<'c, 't> FnOnce(&'c mut PostgresTransaction<'t>) -> BoxFuture<'c, Result<T, E>>
            + Send,
        T: Send,
        E: From<SqlBridgeError> + std::error::Error + Send + Sync + 'static,
    {
        let mut lease = self.core.lease().await.map_err(E::from)?;
        let tx = PostgresTransaction::begin(&mut lease, PostgresBeginOptions::default())
            .await
            .map_err(E::from)?;
        run_managed(tx, f).await
    }
}

impl fmt::Debug for PostgresPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresPool")
            .field("pool_size", &self.core.pool_size())
            .field("connected", &self.core.is_connected())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connectable for PostgresPool {
    type Options = PoolOptions<PostgresConnectionOptions>;

    fn connection_url(&self) -> &str {
        self.core.url()
    }

    fn connection_options(&self) -> &PoolOptions<PostgresConnectionOptions> {
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

/// Each call checks a client out and returns it when the call finishes.
#[async_trait]
impl Queriable for PostgresPool {
    type Engine = Postgres;

    async fn execute(
        &mut self,
        sql: &str,
        params: &[PostgresParam],
    ) -> Result<Option<u64>, SqlBridgeError> {
        let lease = self.core.lease().await?;
        query::execute(&*lease, sql, params).await
    }

    async fn query<T>(&mut self, sql: &str, params: &[PostgresParam]) -> Result<Vec<T>, SqlBridgeError>
    where
        T: FromRow<PostgresExtension> + Send,
    {
        let lease = self.core.lease().await?;
        query::fetch_rows(&*lease, sql, params)
            .await?
            .into_iter()
            .map(T::from_row)
            .collect()
    }

    async fn query_one<T>(
        &mut self,
        sql: &str,
        params: &[PostgresParam],
    ) -> Result<Option<T>, SqlBridgeError>
    where
        T: FromRow<PostgresExtension> + Send,
    {
        let lease = self.core.lease().await?;
        query::fetch_one(&*lease, sql, params)
            .await?
            .map(T::from_row)
            .transpose()
    }

    /// The checked-out client stays with the stream until it is dropped.
    async fn query_many<'a, T>(
        &'a mut self,
        sql: &'a str,
        params: &'a [PostgresParam],
    ) -> Result<RowStream<'a, T>, SqlBridgeError>
    where
        T: FromRow<PostgresExtension> + Send + 'a,
    {
        let lease = self.core.lease().await?;
        let rows = query::stream_raw(&*lease, sql, params).await?;
        Ok(query::object_stream(rows, move |row| {
            let _held = &lease;
            T::from_row(row)
        }))
    }

    async fn query_array<T>(
        &mut self,
        sql: &str,
        params: &[PostgresParam],
    ) -> Result<Vec<T>, SqlBridgeError>
    where
        T: FromArrayRow<PostgresExtension> + Send,
    {
        let lease = self.core.lease().await?;
        query::fetch_array_rows(&*lease, sql, params)
            .await?
            .into_iter()
            .map(T::from_array_row)
            .collect()
    }

    async fn query_one_array<T>(
        &mut self,
        sql: &str,
        params: &[PostgresParam],
    ) -> Result<Option<T>, SqlBridgeError>
    where
        T: FromArrayRow<PostgresExtension> + Send,
    {
        let lease = self.core.lease().await?;
        query::fetch_one_array(&*lease, sql, params)
            .await?
            .map(T::from_array_row)
            .transpose()
    }

    async fn query_many_array<'a, T>(
        &'a mut self,
        sql: &'a str,
        params: &'a [PostgresParam],
    ) -> Result<RowStream<'a, T>, SqlBridgeError>
    where
        T: FromArrayRow<PostgresExtension> + Send + 'a,
    {
        let lease = self.core.lease().await?;
        let rows = query::stream_raw(&*lease, sql, params).await?;
        Ok(query::array_stream(rows, move |row| {
            let _held = &lease;
            T::from_array_row(row)
        }))
    }
}

#[async_trait]
impl Poolable for PostgresPool {
    type Connection = PostgresPoolConnection;

    fn pool_size(&self) -> usize {
        self.core.pool_size()
    }

    async fn acquire(&self) -> Result<PostgresPoolConnection, SqlBridgeError> {
        let lease = self.core.lease().await?;
        tracing::debug!(engine = Postgres::NAME, "connection acquired");
        Ok(PostgresPoolConnection {
            lease: ClientSlot::occupied(Postgres::NAME, lease),
        })
    }
}

/// A PostgreSQL client checked out of a [`PostgresPool`]. Returned to the pool on `release()`
/// or drop.
pub struct PostgresPoolConnection {
    lease: ClientSlot<Lease<PgManager>>,
}

impl PostgresPoolConnection {
    fn native(&self) -> Result<&Client, SqlBridgeError> {
        self.lease.get().map(|lease| &**lease)
    }
}

impl fmt::Debug for PostgresPoolConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresPoolConnection")
            .field("released", &!self.lease.is_set())
            .finish()
    }
}

impl_postgres_queriable!(PostgresPoolConnection);

#[async_trait]
impl Transactionable for PostgresPoolConnection {
    type Transaction<'t>
        = PostgresTransaction<'t>
    where
        Self: 't;

    async fn begin_transaction<'t>(
        &'t mut self,
        options: PostgresBeginOptions,
    ) -> Result<PostgresTransaction<'t>, SqlBridgeError> {
        let lease = self.lease.get_mut()?;
        PostgresTransaction::begin(&mut **lease, options).await
    }
}

#[async_trait]
impl PoolConnection for PostgresPoolConnection {
    fn is_released(&self) -> bool {
        !self.lease.is_set()
    }

    async fn release(&mut self) -> Result<(), SqlBridgeError> {
        if self.lease.take().is_some() {
            tracing::debug!(engine = Postgres::NAME, "connection released");
        }
        Ok(())
    }
}
