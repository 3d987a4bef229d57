//! The capability contracts every engine adapter implements.
//!
//! ```text
//! Queriable ─┬─ Transactionable ─┬─ Connection      (+ Connectable)
//!            │                   └─ PoolConnection
//!            ├─ TransactionQueriable
//!            └─ Poolable ─────────── ConnectionPool  (+ Connectable)
//! ```
//!
//! Optional operations have default bodies that return [`SqlBridgeError::Unsupported`]; an
//! engine overrides the ones listed in its [`Engine::CAPABILITIES`].

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::engine::{BeginOptions, CommitOptions, Engine, EngineParam, Extension, RollbackOptions};
use crate::error::SqlBridgeError;
use crate::results::{FromArrayRow, FromRow};
use crate::stream::RowStream;
use crate::types::{Operation, TransactionState};

fn unsupported<E: Engine>(operation: Operation) -> SqlBridgeError {
    SqlBridgeError::unsupported(E::NAME, operation)
}

/// Statement execution and row fetching.
#[async_trait]
pub trait Queriable: Send {
    type Engine: Engine;

    /// Run a statement and return the affected row count when the engine reports one.
    ///
    /// # Errors
    ///
    /// Precondition errors when no handle is bound, otherwise whatever the native client raises.
    async fn execute(
        &mut self,
        sql: &str,
        params: &[EngineParam<Self::Engine>],
    ) -> Result<Option<u64>, SqlBridgeError>;

    /// Fetch every row of the result as objects.
    ///
    /// # Errors
    ///
    /// Precondition, native, or row conversion errors.
    async fn query<T>(
        &mut self,
        sql: &str,
        params: &[EngineParam<Self::Engine>],
    ) -> Result<Vec<T>, SqlBridgeError>
    where
        T: FromRow<Extension<Self::Engine>> + Send;

    /// First row of [`Queriable::query`], `None` when the result is empty.
    ///
    /// # Errors
    ///
    /// Same as [`Queriable::query`].
    async fn query_one<T>(
        &mut self,
        sql: &str,
        params: &[EngineParam<Self::Engine>],
    ) -> Result<Option<T>, SqlBridgeError>
    where
        T: FromRow<Extension<Self::Engine>> + Send,
    {
        Ok(self.query::<T>(sql, params).await?.into_iter().next())
    }

    /// Stream object rows one at a time.
    ///
    /// # Errors
    ///
    /// `Unsupported` unless the engine streams natively.
    async fn query_many<'a, T>(
        &'a mut self,
        _sql: &'a str,
        _params: &'a [EngineParam<Self::Engine>],
    ) -> Result<RowStream<'a, T>, SqlBridgeError>
    where
        T: FromRow<Extension<Self::Engine>> + Send + 'a,
    {
        Err(unsupported::<Self::Engine>(Operation::QueryMany))
    }

    /// Fetch every row of the result positionally.
    ///
    /// # Errors
    ///
    /// `Unsupported` unless the engine implements positional rows.
    async fn query_array<T>(
        &mut self,
        _sql: &str,
        _params: &[EngineParam<Self::Engine>],
    ) -> Result<Vec<T>, SqlBridgeError>
    where
        T: FromArrayRow<Extension<Self::Engine>> + Send,
    {
        Err(unsupported::<Self::Engine>(Operation::QueryArray))
    }

    /// First row of [`Queriable::query_array`].
    ///
    /// # Errors
    ///
    /// `Unsupported` unless the engine implements positional rows.
    async fn query_one_array<T>(
        &mut self,
        _sql: &str,
        _params: &[EngineParam<Self::Engine>],
    ) -> Result<Option<T>, SqlBridgeError>
    where
        T: FromArrayRow<Extension<Self::Engine>> + Send,
    {
        Err(unsupported::<Self::Engine>(Operation::QueryOneArray))
    }

    /// Stream positional rows one at a time.
    ///
    /// # Errors
    ///
    /// `Unsupported` unless the engine streams positional rows natively.
    async fn query_many_array<'a, T>(
        &'a mut self,
        _sql: &'a str,
        _params: &'a [EngineParam<Self::Engine>],
    ) -> Result<RowStream<'a, T>, SqlBridgeError>
    where
        T: FromArrayRow<Extension<Self::Engine>> + Send + 'a,
    {
        Err(unsupported::<Self::Engine>(Operation::QueryManyArray))
    }
}

/// A live transaction.
#[async_trait]
pub trait TransactionQueriable: Queriable {
    fn state(&self) -> TransactionState;

    /// # Errors
    ///
    /// `TransactionClosed` after a previous commit or rollback, otherwise native errors.
    async fn commit_transaction(
        &mut self,
        options: CommitOptions<Self::Engine>,
    ) -> Result<(), SqlBridgeError>;

    /// Roll back the whole transaction, or only to a savepoint when the options name one.
    ///
    /// # Errors
    ///
    /// `TransactionClosed` after a previous commit or rollback, otherwise native errors.
    async fn rollback_transaction(
        &mut self,
        options: RollbackOptions<Self::Engine>,
    ) -> Result<(), SqlBridgeError>;

    /// # Errors
    ///
    /// `TransactionClosed`, or the engine's error for a duplicate or invalid name.
    async fn create_savepoint(&mut self, name: &str) -> Result<(), SqlBridgeError>;

    /// # Errors
    ///
    /// `TransactionClosed`, or the engine's error for an unknown name.
    async fn release_savepoint(&mut self, name: &str) -> Result<(), SqlBridgeError>;
}

/// Ability to run work under commit/rollback.
#[async_trait]
pub trait Transactionable: Queriable {
    type Transaction<'t>: TransactionQueriable<Engine = Self::Engine>
    where
        Self: 't;

    /// Open a transaction the caller finishes explicitly. Dropping it while open rolls back.
    ///
    /// # Errors
    ///
    /// Precondition errors when no handle is bound, otherwise native errors.
    async fn begin_transaction<'t>(
        &'t mut self,
        options: BeginOptions<Self::Engine>,
    ) -> Result<Self::Transaction<'t>, SqlBridgeError>;

    /// Run `f` inside a transaction opened with default options.
    ///
    /// Commits when `f` returns `Ok`. When `f` returns `Err` the transaction is rolled back and
    /// that error is returned unchanged; if the rollback fails too, the result is
    /// [`SqlBridgeError::RollbackFailed`] carrying both.
    ///
    /// ```rust,no_run
    /// # use sql_bridge::prelude::*;
    /// # async fn demo(conn: &mut SqliteConnection) -> Result<(), SqlBridgeError> {
    /// conn.transaction(|tx| {
    ///     Box::pin(async move {
    ///         tx.execute("INSERT INTO test (name) VALUES (?1)", &[Param::from("John")])
    ///             .await?;
    ///         Ok::<_, SqlBridgeError>(())
    ///     })
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    fn transaction<'t, F, T, E>(&'t mut self, f: F) -> BoxFuture<'t, Result<T, E>>
    where
        Self: Sized,
        F: for<'c> FnOnce(&'c mut Self::Transaction<'t>) -> BoxFuture<'c, Result<T, E>>
            + Send
            + 't,
        T: Send + 't,
        E: From<SqlBridgeError> + std::error::Error + Send + Sync + 'static,
    {
        Box::pin(async move {
            let tx = self
                .begin_transaction(BeginOptions::<Self::Engine>::default())
                .await?;
            run_managed(tx, f).await
        })
    }
}

/// Drive a managed transaction body and finish the transaction exactly once.
pub(crate) async fn run_managed<Tx, F, T, E>(mut tx: Tx, f: F) -> Result<T, E>
where
    Tx: TransactionQueriable,
    F: for<'c> FnOnce(&'c mut Tx) -> BoxFuture<'c, Result<T, E>> + Send,
    T: Send,
    E: From<SqlBridgeError> + std::error::Error + Send + Sync + 'static,
{
    let engine = <Tx::Engine as Engine>::NAME;
    let outcome = f(&mut tx).await;
    match outcome {
        Ok(value) => {
            if tx.state().is_open() {
                tx.commit_transaction(CommitOptions::<Tx::Engine>::default())
                    .await?;
            }
            Ok(value)
        }
        Err(err) => {
            if !tx.state().is_open() {
                return Err(err);
            }
            match tx
                .rollback_transaction(RollbackOptions::<Tx::Engine>::default())
                .await
            {
                Ok(()) => Err(err),
                Err(rollback) => {
                    tracing::warn!(engine, error = %rollback, cause = %err, "rollback after failed transaction body failed");
                    Err(E::from(SqlBridgeError::RollbackFailed {
                        source: Box::new(rollback),
                        cause: Box::new(err),
                    }))
                }
            }
        }
    }
}

/// Connection lifecycle.
#[async_trait]
pub trait Connectable: Send {
    type Options: Send + Sync;

    fn connection_url(&self) -> &str;

    fn connection_options(&self) -> &Self::Options;

    fn is_connected(&self) -> bool;

    /// Bind a native handle.
    ///
    /// # Errors
    ///
    /// `AlreadyConnected` if a handle is bound, otherwise configuration or native errors.
    async fn connect(&mut self) -> Result<(), SqlBridgeError>;

    /// Release the native handle. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Native errors raised while shutting the handle down.
    async fn close(&mut self) -> Result<(), SqlBridgeError>;
}

/// A connection checked out of a pool.
#[async_trait]
pub trait PoolConnection: Transactionable {
    fn is_released(&self) -> bool;

    /// Return the connection to its pool. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Reserved for engines whose release can fail.
    async fn release(&mut self) -> Result<(), SqlBridgeError>;
}

/// Pool acquisition. The pool also answers `Queriable` calls with a connection per call.
#[async_trait]
pub trait Poolable: Queriable + Sync {
    type Connection: PoolConnection<Engine = Self::Engine>;

    fn pool_size(&self) -> usize;

    /// Check a connection out, waiting while all `pool_size` connections are in use.
    ///
    /// # Errors
    ///
    /// `NotConnected` before `connect()`, otherwise pool or native errors.
    async fn acquire(&self) -> Result<Self::Connection, SqlBridgeError>;
}

/// A standalone connection.
pub trait Connection: Connectable + Transactionable {}

impl<C: Connectable + Transactionable> Connection for C {}

/// A pool of connections.
pub trait ConnectionPool: Connectable + Poolable {}

impl<P: Connectable + Poolable> ConnectionPool for P {}
