use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SqlBridgeError;

/// Options for a connection pool: the connection options plus the pool limits.
#[derive(Debug, Clone)]
pub struct PoolOptions<O> {
    pub pool_size: usize,
    pub acquire_timeout: Option<Duration>,
    pub connection: O,
}

impl<O> PoolOptions<O> {
    #[must_use]
    pub fn new(pool_size: usize, connection: O) -> Self {
        Self {
            pool_size,
            acquire_timeout: None,
            connection,
        }
    }

    /// How long `acquire` waits for a free connection before failing.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// The pool size as the pooling collaborator expects it.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConfigError` unless `pool_size` is a positive `u32`.
    pub fn max_size(&self) -> Result<u32, SqlBridgeError> {
        if self.pool_size == 0 {
            return Err(SqlBridgeError::ConfigError(
                "pool_size must be at least 1".to_string(),
            ));
        }
        u32::try_from(self.pool_size).map_err(|_| {
            SqlBridgeError::ConfigError(format!("pool_size {} is too large", self.pool_size))
        })
    }
}

impl<O: Default> Default for PoolOptions<O> {
    fn default() -> Self {
        Self::new(10, O::default())
    }
}

/// The database engines this crate can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// `SQLite` database
    Sqlite,
    /// `PostgreSQL` database
    Postgres,
    /// `MySQL` or `MariaDB` database
    Mysql,
}

impl EngineKind {
    /// Detect the engine from a connection URL scheme. Bare paths are `SQLite` files.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConfigError` for an unknown scheme.
    pub fn from_url(url: &str) -> Result<Self, SqlBridgeError> {
        let Some((scheme, _)) = url.split_once("://") else {
            return Ok(EngineKind::Sqlite);
        };
        match scheme.to_ascii_lowercase().as_str() {
            "sqlite" | "file" => Ok(EngineKind::Sqlite),
            "postgres" | "postgresql" => Ok(EngineKind::Postgres),
            "mysql" | "mariadb" => Ok(EngineKind::Mysql),
            other => Err(SqlBridgeError::ConfigError(format!(
                "unknown connection scheme: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_engine_from_scheme() {
        assert_eq!(
            EngineKind::from_url("postgres://u:p@localhost:5432/db").unwrap(),
            EngineKind::Postgres
        );
        assert_eq!(
            EngineKind::from_url("mysql://root@127.0.0.1/test").unwrap(),
            EngineKind::Mysql
        );
        assert_eq!(EngineKind::from_url(":memory:").unwrap(), EngineKind::Sqlite);
        assert_eq!(
            EngineKind::from_url("sqlite:///tmp/x.db").unwrap(),
            EngineKind::Sqlite
        );
        assert!(EngineKind::from_url("oracle://db").is_err());
    }

    #[test]
    fn pool_size_must_be_positive() {
        assert!(PoolOptions::new(0, ()).max_size().is_err());
        assert_eq!(PoolOptions::new(3, ()).max_size().unwrap(), 3);
    }

    #[test]
    fn engine_kind_parses_like_a_cli_value() {
        assert_eq!(
            EngineKind::from_str("postgres", true).unwrap(),
            EngineKind::Postgres
        );
        let json = serde_json::to_string(&EngineKind::Mysql).unwrap();
        assert_eq!(json, "\"mysql\"");
    }
}
