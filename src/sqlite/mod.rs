//! `SQLite` adapters over `rusqlite`.
//!
//! `rusqlite` is blocking, so every call runs on Tokio's blocking pool while holding the
//! connection mutex. Streaming (`query_many`) keeps a blocking worker pulling the native row
//! iterator one row at a time.

pub mod config;
pub mod connection;
mod macros;
pub mod params;
pub mod pool;
pub mod query;
pub mod transaction;

use serde::Serialize;

use crate::engine::{Engine, TransactionOptions};
use crate::types::{Capabilities, Param};

pub use config::{SharedSqliteConnection, SqliteConnectionOptions, SqliteManager};
pub use connection::SqliteConnection;
pub use pool::{SqlitePool, SqlitePoolConnection};
pub use transaction::{
    SqliteBeginOptions, SqliteRollbackOptions, SqliteTransaction, SqliteTransactionBehavior,
};

/// `SQLite` engine profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

/// `SQLite` values without a portable `Param` variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqliteExtension {
    Blob(Vec<u8>),
}

pub type SqliteParam = Param<SqliteExtension>;

/// Transaction option records for `SQLite`. Commit takes no options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTransactionOptions;

impl TransactionOptions for SqliteTransactionOptions {
    type Begin = SqliteBeginOptions;
    type Commit = ();
    type Rollback = SqliteRollbackOptions;
}

impl Engine for Sqlite {
    const NAME: &'static str = "sqlite";

    const CAPABILITIES: Capabilities = Capabilities {
        query_many: true,
        query_array: true,
        query_one_array: true,
        query_many_array: false,
    };

    type Extension = SqliteExtension;
    type TransactionOptions = SqliteTransactionOptions;
}
