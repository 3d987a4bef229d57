use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::Engine;
use crate::error::SqlBridgeError;
use crate::helpers::quote_identifier;
use crate::pool::Lease;
use crate::traits::TransactionQueriable;
use crate::types::TransactionState;
use crate::wrappers::TransactionHandle;

use super::config::{SharedSqliteConnection, SqliteManager};
use super::macros::impl_sqlite_queriable;
use super::query::run_blocking;
use super::Sqlite;

/// Locking behavior of `BEGIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteTransactionBehavior {
    Deferred,
    Immediate,
    Exclusive,
}

impl SqliteTransactionBehavior {
    fn keyword(self) -> &'static str {
        match self {
            SqliteTransactionBehavior::Deferred => "DEFERRED",
            SqliteTransactionBehavior::Immediate => "IMMEDIATE",
            SqliteTransactionBehavior::Exclusive => "EXCLUSIVE",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SqliteBeginOptions {
    pub behavior: Option<SqliteTransactionBehavior>,
}

impl SqliteBeginOptions {
    #[must_use]
    pub fn behavior(behavior: SqliteTransactionBehavior) -> Self {
        Self {
            behavior: Some(behavior),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SqliteRollbackOptions {
    /// Roll back to this savepoint and keep the transaction open.
    pub savepoint: Option<String>,
}

impl SqliteRollbackOptions {
    #[must_use]
    pub fn to_savepoint(name: impl Into<String>) -> Self {
        Self {
            savepoint: Some(name.into()),
        }
    }
}

pub(crate) fn begin_statement(options: &SqliteBeginOptions) -> String {
    match options.behavior {
        Some(behavior) => format!("BEGIN {}", behavior.keyword()),
        None => "BEGIN".to_string(),
    }
}

pub(crate) fn rollback_statement(options: &SqliteRollbackOptions) -> String {
    match &options.savepoint {
        Some(name) => format!("ROLLBACK TO SAVEPOINT {}", quote_identifier(name, '"')),
        None => "ROLLBACK".to_string(),
    }
}

async fn batch(conn: SharedSqliteConnection, sql: String) -> Result<(), SqlBridgeError> {
    run_blocking(conn, move |guard| {
        guard.execute_batch(&sql)?;
        Ok(())
    })
    .await
}

/// A transaction opened with an explicit `BEGIN` on a `SQLite` connection.
///
/// Borrows its connection (or pool lease) for `'c`. Dropping it while open issues a
/// `ROLLBACK` on the blocking pool, ahead of any statement sent afterwards.
pub struct SqliteTransaction<'c> {
    handle: TransactionHandle<SharedSqliteConnection>,
    lease: Option<Lease<SqliteManager>>,
    _conn: PhantomData<&'c mut ()>,
}

impl SqliteTransaction<'_> {
    pub(crate) async fn begin(
        shared: SharedSqliteConnection,
        lease: Option<Lease<SqliteManager>>,
        options: SqliteBeginOptions,
    ) -> Result<Self, SqlBridgeError> {
        let sql = begin_statement(&options);
        batch(Arc::clone(&shared), sql).await?;
        tracing::debug!(engine = Sqlite::NAME, ?options, "transaction started");
        Ok(Self {
            handle: TransactionHandle::open(Sqlite::NAME, shared),
            lease,
            _conn: PhantomData,
        })
    }

    fn shared(&self) -> Result<SharedSqliteConnection, SqlBridgeError> {
        self.handle.get().map(Arc::clone)
    }
}

impl fmt::Debug for SqliteTransaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("state", &self.handle.state())
            .field("pooled", &self.lease.is_some())
            .finish()
    }
}

impl_sqlite_queriable!(SqliteTransaction<'c>);

#[async_trait]
impl TransactionQueriable for SqliteTransaction<'_> {
    fn state(&self) -> TransactionState {
        self.handle.state()
    }

    async fn commit_transaction(&mut self, _options: ()) -> Result<(), SqlBridgeError> {
        batch(self.shared()?, "COMMIT".to_string()).await?;
        self.handle.finish(TransactionState::Committed)?;
        tracing::debug!(engine = Sqlite::NAME, "transaction committed");
        Ok(())
    }

    async fn rollback_transaction(
        &mut self,
        options: SqliteRollbackOptions,
    ) -> Result<(), SqlBridgeError> {
        let shared = self.shared()?;
        let partial = options.savepoint.is_some();
        let result = batch(shared, rollback_statement(&options)).await;
        if partial {
            return result;
        }
        // A failed ROLLBACK still ends the transaction from the caller's point of view.
        self.handle.finish(TransactionState::RolledBack)?;
        tracing::debug!(engine = Sqlite::NAME, ok = result.is_ok(), "transaction rolled back");
        result
    }

    async fn create_savepoint(&mut self, name: &str) -> Result<(), SqlBridgeError> {
        let sql = format!("SAVEPOINT {}", quote_identifier(name, '"'));
        batch(self.shared()?, sql).await
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<(), SqlBridgeError> {
        let sql = format!("RELEASE SAVEPOINT {}", quote_identifier(name, '"'));
        batch(self.shared()?, sql).await
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        let Some(shared) = self.handle.take_if_open() else {
            return;
        };
        let lease = self.lease.take();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                engine = Sqlite::NAME,
                "transaction dropped outside a runtime; left open"
            );
            return;
        };
        // Holding the lock from here on queues every later statement behind the ROLLBACK.
        let held = Arc::clone(&shared).try_lock_owned().ok();
        runtime.spawn_blocking(move || {
            let guard = held.unwrap_or_else(|| shared.blocking_lock_owned());
            if let Err(e) = guard.execute_batch("ROLLBACK") {
                tracing::warn!(engine = Sqlite::NAME, error = %e, "rollback of dropped transaction failed");
            }
            drop(guard);
            drop(lease);
        });
    }
}
