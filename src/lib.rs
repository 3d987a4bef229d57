//! Uniform async connection, query and transaction contracts over `rusqlite`, `tokio-postgres`
//! and `mysql_async`.
//!
//! Every engine adapter implements the same capability traits from [`traits`]:
//!
//! - [`Queriable`](traits::Queriable): `execute`, `query`, `query_one`, streaming `query_many`,
//!   and the positional `query_array` family.
//! - [`Transactionable`](traits::Transactionable) and
//!   [`TransactionQueriable`](traits::TransactionQueriable): begin, commit, rollback,
//!   savepoints, and the managed `transaction(f)` helper.
//! - [`Connectable`](traits::Connectable) and [`Poolable`](traits::Poolable).
//!
//! Each adapter is tied to an [`Engine`](engine::Engine) profile that fixes its parameter
//! extension and transaction option records, so options cannot be mixed across engines.
//!
//! ```rust,no_run
//! use sql_bridge::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlBridgeError> {
//! let mut conn = SqliteConnection::new(":memory:");
//! conn.connect().await?;
//! conn.execute("CREATE TABLE users (id INTEGER, name TEXT)", &[]).await?;
//!
//! conn.transaction(|tx| {
//!     Box::pin(async move {
//!         tx.execute("INSERT INTO users VALUES (?1, ?2)", &[Param::Int(1), Param::from("ada")])
//!             .await?;
//!         Ok::<_, SqlBridgeError>(())
//!     })
//! })
//! .await?;
//!
//! let user: Option<Row<SqliteExtension>> =
//!     conn.query_one("SELECT * FROM users WHERE id = ?1", &[Param::Int(1)]).await?;
//! assert_eq!(user.and_then(|row| row.get("name").cloned()), Some(Param::from("ada")));
//! # Ok(())
//! # }
//! ```
//!
//! Features: `sqlite` and `postgres` are on by default; `mysql` is opt-in.

pub mod config;
pub mod engine;
pub mod error;
pub mod helpers;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod pool;
pub mod prelude;
pub mod results;
pub mod stream;
pub mod traits;
pub mod types;
pub mod wrappers;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::SqlBridgeError;
