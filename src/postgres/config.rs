use std::future::Future;
use std::time::Duration;

use bb8::ManageConnection;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls};

use crate::engine::Engine;
use crate::error::SqlBridgeError;
use crate::pool::PoolManager;

use super::Postgres;

/// Options applied on top of the connection URL. Set values win over the URL's.
#[derive(Debug, Clone, Default)]
pub struct PostgresConnectionOptions {
    pub application_name: Option<String>,
    pub connect_timeout: Option<Duration>,
    /// Server `options` string, e.g. `-c search_path=app`.
    pub options: Option<String>,
}

impl PostgresConnectionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Parse `url` and apply these options over it.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConfigError` for a malformed URL.
    pub fn config(&self, url: &str) -> Result<Config, SqlBridgeError> {
        let mut config: Config = url
            .parse()
            .map_err(|e| SqlBridgeError::ConfigError(format!("invalid postgres url: {e}")))?;
        if let Some(name) = &self.application_name {
            config.application_name(name);
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout(timeout);
        }
        if let Some(options) = &self.options {
            config.options(options);
        }
        Ok(config)
    }
}

/// Connect and drive the connection future on its own task.
pub(crate) async fn connect_client(
    config: &Config,
) -> Result<(Client, JoinHandle<()>), tokio_postgres::Error> {
    let (client, connection) = config.connect(NoTls).await?;
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(engine = Postgres::NAME, error = %e, "connection terminated");
        }
    });
    Ok((client, driver))
}

/// bb8 manager for `tokio-postgres` clients.
#[derive(Debug, Clone)]
pub struct PgManager {
    config: Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ManageConnection for PgManager {
    type Connection = Client;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let config = self.config.clone();
        async move {
            tracing::debug!(
                engine = Postgres::NAME,
                hosts = ?config.get_hosts(),
                dbname = ?config.get_dbname(),
                "pool connect"
            );
            let (client, _driver) = connect_client(&config).await?;
            Ok(client)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}

impl PoolManager for PgManager {
    type Options = PostgresConnectionOptions;

    fn from_parts(url: &str, options: &PostgresConnectionOptions) -> Result<Self, SqlBridgeError> {
        Ok(Self::new(options.config(url)?))
    }
}
