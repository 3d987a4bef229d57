use std::fmt;

use async_trait::async_trait;
use mysql_async::Conn;
use mysql_async::prelude::Queryable;

use crate::engine::Engine;
use crate::error::SqlBridgeError;
use crate::traits::{Connectable, Transactionable};
use crate::wrappers::ClientSlot;

use super::MySql;
use super::config::MySqlConnectionOptions;
use super::macros::impl_mysql_queriable;
use super::transaction::{MySqlBeginOptions, MySqlTransaction};

/// A native connection plus the rollback owed by a dropped transaction.
pub(crate) struct MySqlSession {
    pub(crate) conn: Conn,
    pub(crate) pending_rollback: bool,
}

impl MySqlSession {
    /// Settle a deferred rollback, then hand out the connection.
    async fn ready(&mut self) -> Result<&mut Conn, SqlBridgeError> {
        if self.pending_rollback {
            self.conn.query_drop("ROLLBACK").await?;
            self.pending_rollback = false;
            tracing::debug!(engine = MySql::NAME, "deferred rollback applied");
        }
        Ok(&mut self.conn)
    }
}

/// A single MySQL connection.
pub struct MySqlConnection {
    url: String,
    options: MySqlConnectionOptions,
    session: ClientSlot<MySqlSession>,
}

impl MySqlConnection {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_options(url, MySqlConnectionOptions::default())
    }

    #[must_use]
    pub fn with_options(url: impl Into<String>, options: MySqlConnectionOptions) -> Self {
        Self {
            url: url.into(),
            options,
            session: ClientSlot::empty(MySql::NAME),
        }
    }

    /// The bound native connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::NotConnected` before `connect()` or after `close()`.
    pub fn client(&mut self) -> Result<&mut Conn, SqlBridgeError> {
        Ok(&mut self.session.get_mut()?.conn)
    }

    async fn conn(&mut self) -> Result<&mut Conn, SqlBridgeError> {
        self.session.get_mut()?.ready().await
    }
}

impl fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("options", &self.options)
            .field("connected", &self.session.is_set())
            .finish_non_exhaustive()
    }
}

impl_mysql_queriable!(MySqlConnection, |this| this.conn().await?);

#[async_trait]
impl Connectable for MySqlConnection {
    type Options = MySqlConnectionOptions;

    fn connection_url(&self) -> &str {
        &self.url
    }

    fn connection_options(&self) -> &MySqlConnectionOptions {
        &self.options
    }

    fn is_connected(&self) -> bool {
        self.session.is_set()
    }

    async fn connect(&mut self) -> Result<(), SqlBridgeError> {
        if self.session.is_set() {
            return Err(SqlBridgeError::AlreadyConnected {
                engine: MySql::NAME,
            });
        }
        let opts = self.options.opts(&self.url)?;
        let conn = Conn::new(opts).await?;
        tracing::debug!(engine = MySql::NAME, connection_id = conn.id(), "connected");
        self.session.set(Some(MySqlSession {
            conn,
            pending_rollback: false,
        }));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        session.conn.disconnect().await?;
        tracing::debug!(engine = MySql::NAME, "closed");
        Ok(())
    }
}

#[async_trait]
impl Transactionable for MySqlConnection {
    type Transaction<'t>
        = MySqlTransaction<'t>
    where
        Self: 't;

    async fn begin_transaction<'t>(
        &'t mut self,
        options: MySqlBeginOptions,
    ) -> Result<MySqlTransaction<'t>, SqlBridgeError> {
        let session = self.session.get_mut()?;
        session.ready().await?;
        MySqlTransaction::begin(session, options).await
    }
}
