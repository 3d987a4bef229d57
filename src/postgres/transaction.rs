use std::fmt;

use async_trait::async_trait;
use tokio_postgres::{Client, IsolationLevel};

use crate::engine::Engine;
use crate::error::SqlBridgeError;
use crate::helpers::quote_identifier;
use crate::traits::TransactionQueriable;
use crate::types::TransactionState;
use crate::wrappers::TransactionHandle;

use super::Postgres;
use super::macros::impl_postgres_queriable;

#[derive(Debug, Clone, Default)]
pub struct PostgresBeginOptions {
    /// Label carried in log fields; the server does not see it.
    pub name: Option<String>,
    pub isolation_level: Option<IsolationLevel>,
    pub read_only: Option<bool>,
    pub deferrable: Option<bool>,
}

impl PostgresBeginOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    #[must_use]
    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostgresCommitOptions {
    /// `COMMIT AND CHAIN`: commit and immediately continue in a new transaction.
    pub chain: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PostgresRollbackOptions {
    /// `ROLLBACK AND CHAIN`.
    pub chain: bool,
    /// Roll back to this savepoint and keep the transaction open.
    pub savepoint: Option<String>,
}

impl PostgresRollbackOptions {
    #[must_use]
    pub fn to_savepoint(name: impl Into<String>) -> Self {
        Self {
            chain: false,
            savepoint: Some(name.into()),
        }
    }
}

/// A server transaction borrowed from a PostgreSQL client for `'c`.
///
/// Dropping it while open rolls back through `tokio_postgres::Transaction`'s own drop.
pub struct PostgresTransaction<'c> {
    handle: TransactionHandle<tokio_postgres::Transaction<'c>>,
    name: Option<String>,
}

impl<'c> PostgresTransaction<'c> {
    pub(crate) async fn begin(
        client: &'c mut Client,
        options: PostgresBeginOptions,
    ) -> Result<Self, SqlBridgeError> {
        let mut builder = client.build_transaction();
        if let Some(level) = options.isolation_level {
            builder = builder.isolation_level(level);
        }
        if let Some(read_only) = options.read_only {
            builder = builder.read_only(read_only);
        }
        if let Some(deferrable) = options.deferrable {
            builder = builder.deferrable(deferrable);
        }
        let tx = builder.start().await?;
        tracing::debug!(engine = Postgres::NAME, name = ?options.name, "transaction started");
        Ok(Self {
            handle: TransactionHandle::open(Postgres::NAME, tx),
            name: options.name,
        })
    }

    fn native(&self) -> Result<&tokio_postgres::Transaction<'c>, SqlBridgeError> {
        self.handle.get()
    }

    async fn batch(&self, sql: &str) -> Result<(), SqlBridgeError> {
        self.native()?.batch_execute(sql).await?;
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for PostgresTransaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresTransaction")
            .field("name", &self.name)
            .field("state", &self.handle.state())
            .finish()
    }
}

impl_postgres_queriable!(PostgresTransaction<'c>);

#[async_trait]
impl TransactionQueriable for PostgresTransaction<'_> {
    fn state(&self) -> TransactionState {
        self.handle.state()
    }

    async fn commit_transaction(
        &mut self,
        options: PostgresCommitOptions,
    ) -> Result<(), SqlBridgeError> {
        if options.chain {
            return self.batch("COMMIT AND CHAIN").await;
        }
        let tx = self.handle.finish(TransactionState::Committed)?;
        tx.commit().await?;
        tracing::debug!(engine = Postgres::NAME, name = ?self.name, "transaction committed");
        Ok(())
    }

    async fn rollback_transaction(
        &mut self,
        options: PostgresRollbackOptions,
    ) -> Result<(), SqlBridgeError> {
        if let Some(savepoint) = &options.savepoint {
            let sql = format!("ROLLBACK TO SAVEPOINT {}", quote_identifier(savepoint, '"'));
            return self.batch(&sql).await;
        }
        if options.chain {
            return self.batch("ROLLBACK AND CHAIN").await;
        }
        let tx = self.handle.finish(TransactionState::RolledBack)?;
        tx.rollback().await?;
        tracing::debug!(engine = Postgres::NAME, name = ?self.name, "transaction rolled back");
        Ok(())
    }

    async fn create_savepoint(&mut self, name: &str) -> Result<(), SqlBridgeError> {
        self.batch(&format!("SAVEPOINT {}", quote_identifier(name, '"')))
            .await
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<(), SqlBridgeError> {
        self.batch(&format!("RELEASE SAVEPOINT {}", quote_identifier(name, '"')))
            .await
    }
}
