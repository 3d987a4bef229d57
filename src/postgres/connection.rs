use std::fmt;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::Client;

use crate::engine::Engine;
use crate::error::SqlBridgeError;
use crate::traits::{Connectable, Transactionable};
use crate::wrappers::ClientSlot;

use super::Postgres;
use super::config::{PostgresConnectionOptions, connect_client};
use super::macros::impl_postgres_queriable;
use super::transaction::{PostgresBeginOptions, PostgresTransaction};

/// A client plus the task driving its connection.
struct PgClient {
    client: Client,
    driver: JoinHandle<()>,
}

/// A single PostgreSQL connection.
///
/// ```rust,no_run
/// # use sql_bridge::prelude::*;
/// # async fn demo() -> Result<(), SqlBridgeError> {
/// let mut conn = PostgresConnection::new("postgres://app@localhost/app");
/// conn.connect().await?;
/// let rows: Vec<Row<PostgresExtension>> = conn
///     .query("SELECT id, name FROM users WHERE id = $1", &[Param::Int(1)])
///     .await?;
/// conn.close().await?;
/// # let _ = rows;
/// # Ok(())
/// # }
/// ```
pub struct PostgresConnection {
    url: String,
    options: PostgresConnectionOptions,
    client: ClientSlot<PgClient>,
}

impl PostgresConnection {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_options(url, PostgresConnectionOptions::default())
    }

    #[must_use]
    pub fn with_options(url: impl Into<String>, options: PostgresConnectionOptions) -> Self {
        Self {
            url: url.into(),
            options,
            client: ClientSlot::empty(Postgres::NAME),
        }
    }

    /// The bound native client.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::NotConnected` before `connect()` or after `close()`.
    pub fn client(&self) -> Result<&Client, SqlBridgeError> {
        self.native()
    }

    fn native(&self) -> Result<&Client, SqlBridgeError> {
        self.client.get().map(|pg| &pg.client)
    }
}

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("options", &self.options)
            .field("connected", &self.client.is_set())
            .finish_non_exhaustive()
    }
}

impl_postgres_queriable!(PostgresConnection);

#[async_trait]
impl Connectable for PostgresConnection {
    type Options = PostgresConnectionOptions;

    fn connection_url(&self) -> &str {
        &self.url
    }

    fn connection_options(&self) -> &PostgresConnectionOptions {
        &self.options
    }

    fn is_connected(&self) -> bool {
        self.client.is_set()
    }

    async fn connect(&mut self) -> Result<(), SqlBridgeError> {
        if self.client.is_set() {
            return Err(SqlBridgeError::AlreadyConnected {
                engine: Postgres::NAME,
            });
        }
        let config = self.options.config(&self.url)?;
        let (client, driver) = connect_client(&config).await?;
        tracing::debug!(engine = Postgres::NAME, dbname = ?config.get_dbname(), "connected");
        self.client.set(Some(PgClient { client, driver }));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        let Some(PgClient { client, driver }) = self.client.take() else {
            return Ok(());
        };
        // The driver task finishes once the last client handle is gone.
        drop(client);
        driver.await?;
        tracing::debug!(engine = Postgres::NAME, "closed");
        Ok(())
    }
}

#[async_trait]
impl Transactionable for PostgresConnection {
    type Transaction<'t>
        = PostgresTransaction<'t>
    where
        Self: 't;

    async fn begin_transaction<'t>(
        &'t mut self,
        options: PostgresBeginOptions,
    ) -> Result<PostgresTransaction<'t>, SqlBridgeError> {
        let pg = self.client.get_mut()?;
        PostgresTransaction::begin(&mut pg.client, options).await
    }
}
