//! MySQL adapters over `mysql_async`.
//!
//! Transactions are explicit `START TRANSACTION` statements on the borrowed connection. A
//! transaction dropped while open cannot roll back from `Drop`, so the connection remembers it
//! and issues the `ROLLBACK` before its next statement.

pub mod config;
pub mod connection;
mod macros;
pub mod params;
pub mod query;
pub mod transaction;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::engine::{Engine, TransactionOptions};
use crate::types::{Capabilities, Param};

pub use config::MySqlConnectionOptions;
pub use connection::MySqlConnection;
pub use transaction::{
    MySqlAccessMode, MySqlBeginOptions, MySqlCommitOptions, MySqlRollbackOptions,
    MySqlTransaction,
};

/// MySQL engine profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

/// MySQL values without a portable `Param` variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MySqlExtension {
    /// Columns with the binary character set.
    Bytes(Vec<u8>),
    /// Unsigned integers above `i64::MAX`.
    UInt(u64),
    DateTime(NaiveDateTime),
}

pub type MySqlParam = Param<MySqlExtension>;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlTransactionOptions;

impl TransactionOptions for MySqlTransactionOptions {
    type Begin = MySqlBeginOptions;
    type Commit = MySqlCommitOptions;
    type Rollback = MySqlRollbackOptions;
}

impl Engine for MySql {
    const NAME: &'static str = "mysql";

    const CAPABILITIES: Capabilities = Capabilities {
        query_many: true,
        query_array: false,
        query_one_array: false,
        query_many_array: false,
    };

    type Extension = MySqlExtension;
    type TransactionOptions = MySqlTransactionOptions;
}
