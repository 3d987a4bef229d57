use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::ManageConnection;
use rusqlite::OpenFlags;
use tokio::sync::Mutex;

use crate::error::SqlBridgeError;
use crate::pool::PoolManager;

use super::query::run_blocking;

/// A `rusqlite` connection shared between the adapter and its blocking workers.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone, Default)]
pub struct SqliteConnectionOptions {
    pub flags: OpenFlags,
    pub busy_timeout: Option<Duration>,
    /// Statements run once right after the database is opened (pragmas and similar).
    pub init_statements: Vec<String>,
}

impl SqliteConnectionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn init_statement(mut self, sql: impl Into<String>) -> Self {
        self.init_statements.push(sql.into());
        self
    }

    /// Enable write-ahead logging, which lets pooled connections read while one writes.
    #[must_use]
    pub fn wal(self) -> Self {
        self.init_statement("PRAGMA journal_mode = WAL;")
    }
}

/// Turn a connection URL into the path `rusqlite` opens.
///
/// Accepts a plain path, `:memory:`, or a `sqlite://` prefixed path.
#[must_use]
pub fn database_path(url: &str) -> &str {
    url.strip_prefix("sqlite://").unwrap_or(url)
}

/// Open the database on the blocking pool and apply `options`.
///
/// # Errors
///
/// Returns `SqlBridgeError::SqliteError` if the database cannot be opened or configured.
pub async fn open_shared(
    url: &str,
    options: &SqliteConnectionOptions,
) -> Result<SharedSqliteConnection, SqlBridgeError> {
    let path = database_path(url).to_string();
    let options = options.clone();
    let conn = tokio::task::spawn_blocking(move || -> Result<_, SqlBridgeError> {
        let conn = rusqlite::Connection::open_with_flags(&path, options.flags)?;
        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        for sql in &options.init_statements {
            conn.execute_batch(sql)?;
        }
        Ok(conn)
    })
    .await??;
    Ok(Arc::new(Mutex::new(conn)))
}

/// bb8 manager that opens `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    url: String,
    options: SqliteConnectionOptions,
}

impl SqliteManager {
    #[must_use]
    pub fn new(url: String, options: SqliteConnectionOptions) -> Self {
        Self { url, options }
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = SqlBridgeError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let url = self.url.clone();
        let options = self.options.clone();
        async move { open_shared(&url, &options).await }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            run_blocking(handle, |guard| {
                guard.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

impl PoolManager for SqliteManager {
    type Options = SqliteConnectionOptions;

    fn from_parts(url: &str, options: &Self::Options) -> Result<Self, SqlBridgeError> {
        if database_path(url).is_empty() {
            return Err(SqlBridgeError::ConfigError(
                "sqlite database path is required".to_string(),
            ));
        }
        Ok(Self::new(url.to_string(), options.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme() {
        assert_eq!(database_path("sqlite:///tmp/a.db"), "/tmp/a.db");
        assert_eq!(database_path(":memory:"), ":memory:");
        assert_eq!(database_path("data/app.db"), "data/app.db");
    }

    #[test]
    fn manager_requires_a_path() {
        assert!(SqliteManager::from_parts("sqlite://", &SqliteConnectionOptions::new()).is_err());
        assert!(SqliteManager::from_parts(":memory:", &SqliteConnectionOptions::new()).is_ok());
    }

    #[tokio::test]
    async fn init_statements_run_on_open() {
        let options = SqliteConnectionOptions::new()
            .busy_timeout(Duration::from_millis(250))
            .init_statement("CREATE TABLE seeded (id INTEGER)");
        let shared = open_shared(":memory:", &options).await.unwrap();
        let count: i64 = run_blocking(shared, |guard| {
            Ok(guard.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'seeded'",
                [],
                |row| row.get(0),
            )?)
        })
        .await
        .unwrap();
        assert_eq!(count, 1);
    }
}
