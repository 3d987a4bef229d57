//! PostgreSQL adapters over `tokio-postgres`.
//!
//! Pools use `bb8` with [`PgManager`]. Transactions wrap the native
//! `tokio_postgres::Transaction`, so dropping one while open rolls it back on the server.

pub mod config;
pub mod connection;
mod macros;
pub mod params;
pub mod pool;
pub mod query;
pub mod transaction;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::engine::{Engine, TransactionOptions};
use crate::types::{Capabilities, Param};

pub use config::{PgManager, PostgresConnectionOptions};
pub use connection::PostgresConnection;
pub use pool::{PostgresPool, PostgresPoolConnection};
pub use transaction::{
    PostgresBeginOptions, PostgresCommitOptions, PostgresRollbackOptions, PostgresTransaction,
};
pub use tokio_postgres::IsolationLevel;

/// PostgreSQL engine profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

/// PostgreSQL values without a portable `Param` variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PostgresExtension {
    /// `timestamp`; `timestamptz` columns are read as UTC.
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    /// `json` and `jsonb`.
    Json(serde_json::Value),
    /// `bytea`.
    Bytes(Vec<u8>),
}

pub type PostgresParam = Param<PostgresExtension>;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresTransactionOptions;

impl TransactionOptions for PostgresTransactionOptions {
    type Begin = PostgresBeginOptions;
    type Commit = PostgresCommitOptions;
    type Rollback = PostgresRollbackOptions;
}

impl Engine for Postgres {
    const NAME: &'static str = "postgres";

    const CAPABILITIES: Capabilities = Capabilities::all();

    type Extension = PostgresExtension;
    type TransactionOptions = PostgresTransactionOptions;
}
