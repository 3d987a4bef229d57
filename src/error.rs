use thiserror::Error;

use crate::types::{Operation, TransactionState};

/// Boxed error returned by a managed transaction body.
pub type BoxDynError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SqlBridgeError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MySqlError(#[from] mysql_async::Error),

    /// A `Queriable` call was made while no native handle is bound.
    #[error("{engine} connection is not established, call connect() first")]
    NotConnected { engine: &'static str },

    #[error("{engine} connection is already established, call close() first")]
    AlreadyConnected { engine: &'static str },

    /// The transaction was used after it reached a terminal state.
    #[error("{engine} transaction is already {state}")]
    TransactionClosed {
        engine: &'static str,
        state: TransactionState,
    },

    #[error("{operation} is not supported by {engine}")]
    Unsupported {
        engine: &'static str,
        operation: Operation,
    },

    /// The automatic rollback of a managed transaction failed. `source` is the rollback
    /// failure, `cause` the error that triggered the rollback.
    #[error("rollback failed after transaction error ({cause}): {source}")]
    RollbackFailed {
        source: Box<SqlBridgeError>,
        cause: BoxDynError,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Row conversion error: {0}")]
    ConversionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlBridgeError {
    #[must_use]
    pub fn unsupported(engine: &'static str, operation: Operation) -> Self {
        Self::Unsupported { engine, operation }
    }

    /// True for errors raised before the native client was reached.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. } | Self::AlreadyConnected { .. } | Self::TransactionClosed { .. }
        )
    }

    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected { .. })
    }

    #[must_use]
    pub fn is_transaction_closed(&self) -> bool {
        matches!(self, Self::TransactionClosed { .. })
    }
}

#[cfg(feature = "postgres")]
impl From<bb8::RunError<tokio_postgres::Error>> for SqlBridgeError {
    fn from(err: bb8::RunError<tokio_postgres::Error>) -> Self {
        match err {
            bb8::RunError::User(inner) => SqlBridgeError::PostgresError(inner),
            bb8::RunError::TimedOut => {
                SqlBridgeError::ConnectionError("PostgreSQL pool error: timed out".to_string())
            }
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<bb8::RunError<SqlBridgeError>> for SqlBridgeError {
    fn from(err: bb8::RunError<SqlBridgeError>) -> Self {
        match err {
            bb8::RunError::User(inner) => inner,
            bb8::RunError::TimedOut => {
                SqlBridgeError::ConnectionError("SQLite pool error: timed out".to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for SqlBridgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        SqlBridgeError::ExecutionError(format!("blocking task join error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_classification() {
        let err = SqlBridgeError::NotConnected { engine: "sqlite" };
        assert!(err.is_precondition());
        assert!(err.is_not_connected());
        assert_eq!(
            err.to_string(),
            "sqlite connection is not established, call connect() first"
        );

        let closed = SqlBridgeError::TransactionClosed {
            engine: "postgres",
            state: TransactionState::Committed,
        };
        assert!(closed.is_precondition());
        assert_eq!(closed.to_string(), "postgres transaction is already committed");

        let unsupported = SqlBridgeError::unsupported("mysql", Operation::QueryManyArray);
        assert!(unsupported.is_unsupported());
        assert!(!unsupported.is_precondition());
        assert_eq!(
            unsupported.to_string(),
            "query_many_array is not supported by mysql"
        );
    }

    #[test]
    fn rollback_failure_keeps_both_errors() {
        let cause: BoxDynError = Box::new(SqlBridgeError::ExecutionError("boom".into()));
        let err = SqlBridgeError::RollbackFailed {
            source: Box::new(SqlBridgeError::ConnectionError("gone".into())),
            cause,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("boom"));
        assert!(rendered.contains("gone"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Connection error: gone"));
    }
}
