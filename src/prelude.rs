//! Convenient imports for common functionality.
//!
//! Brings the contract traits into scope along with the row and parameter types and every
//! enabled engine adapter.

pub use crate::config::{EngineKind, PoolOptions};
pub use crate::engine::{Engine, EngineArrayRow, EngineParam, EngineRow};
pub use crate::error::SqlBridgeError;
pub use crate::results::{ArrayRow, FromArrayRow, FromRow, Row};
pub use crate::stream::RowStream;
pub use crate::traits::{
    Connectable, Connection, ConnectionPool, PoolConnection, Poolable, Queriable,
    TransactionQueriable, Transactionable,
};
pub use crate::types::{Capabilities, FromParam, Operation, Param, TransactionState};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{
    Sqlite, SqliteBeginOptions, SqliteConnection, SqliteConnectionOptions, SqliteExtension,
    SqliteParam, SqlitePool, SqlitePoolConnection, SqliteRollbackOptions, SqliteTransaction,
    SqliteTransactionBehavior,
};

#[cfg(feature = "postgres")]
pub use crate::postgres::{
    IsolationLevel, Postgres, PostgresBeginOptions, PostgresCommitOptions, PostgresConnection,
    PostgresConnectionOptions, PostgresExtension, PostgresParam, PostgresPool,
    PostgresPoolConnection, PostgresRollbackOptions, PostgresTransaction,
};

#[cfg(feature = "mysql")]
pub use crate::mysql::{
    MySql, MySqlAccessMode, MySqlBeginOptions, MySqlCommitOptions, MySqlConnection,
    MySqlConnectionOptions, MySqlExtension, MySqlParam, MySqlRollbackOptions, MySqlTransaction,
};
