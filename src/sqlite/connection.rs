use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SqlBridgeError;
use crate::traits::{Connectable, Transactionable};
use crate::wrappers::ClientSlot;

use super::config::{SharedSqliteConnection, SqliteConnectionOptions, open_shared};
use super::macros::impl_sqlite_queriable;
use super::transaction::{SqliteBeginOptions, SqliteTransaction};
use super::Sqlite;
use crate::engine::Engine;

/// A single `SQLite` database connection.
///
/// ```rust,no_run
/// # use sql_bridge::prelude::*;
/// # async fn demo() -> Result<(), SqlBridgeError> {
/// let mut conn = SqliteConnection::new(":memory:");
/// conn.connect().await?;
/// conn.execute("CREATE TABLE test (name TEXT, age INTEGER)", &[]).await?;
/// let rows: Vec<Row<SqliteExtension>> = conn.query("SELECT * FROM test", &[]).await?;
/// conn.close().await?;
/// # let _ = rows;
/// # Ok(())
/// # }
/// ```
pub struct SqliteConnection {
    url: String,
    options: SqliteConnectionOptions,
    client: ClientSlot<SharedSqliteConnection>,
}

impl SqliteConnection {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_options(url, SqliteConnectionOptions::default())
    }

    #[must_use]
    pub fn with_options(url: impl Into<String>, options: SqliteConnectionOptions) -> Self {
        Self {
            url: url.into(),
            options,
            client: ClientSlot::empty(Sqlite::NAME),
        }
    }

    /// The bound native connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::NotConnected` before `connect()` or after `close()`.
    pub fn client(&self) -> Result<&SharedSqliteConnection, SqlBridgeError> {
        self.client.get()
    }

    fn shared(&self) -> Result<SharedSqliteConnection, SqlBridgeError> {
        self.client.get().map(Arc::clone)
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("connected", &self.client.is_set())
            .finish()
    }
}

impl_sqlite_queriable!(SqliteConnection);

#[async_trait]
impl Connectable for SqliteConnection {
    type Options = SqliteConnectionOptions;

    fn connection_url(&self) -> &str {
        &self.url
    }

    fn connection_options(&self) -> &SqliteConnectionOptions {
        &self.options
    }

    fn is_connected(&self) -> bool {
        self.client.is_set()
    }

    async fn connect(&mut self) -> Result<(), SqlBridgeError> {
        if self.client.is_set() {
            return Err(SqlBridgeError::AlreadyConnected {
                engine: Sqlite::NAME,
            });
        }
        let shared = open_shared(&self.url, &self.options).await?;
        tracing::debug!(engine = Sqlite::NAME, url = %self.url, "connected");
        self.client.set(Some(shared));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        if self.client.take().is_some() {
            tracing::debug!(engine = Sqlite::NAME, url = %self.url, "closed");
        }
        Ok(())
    }
}

#[async_trait]
impl Transactionable for SqliteConnection {
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
