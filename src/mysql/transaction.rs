use std::fmt;

use async_trait::async_trait;
use mysql_async::Conn;
use mysql_async::prelude::Queryable;

use crate::engine::Engine;
use crate::error::SqlBridgeError;
use crate::helpers::quote_identifier;
use crate::traits::TransactionQueriable;
use crate::types::TransactionState;
use crate::wrappers::TransactionHandle;

use super::MySql;
use super::connection::MySqlSession;
use super::macros::impl_mysql_queriable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MySqlAccessMode {
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone, Default)]
pub struct MySqlBeginOptions {
    pub with_consistent_snapshot: bool,
    pub access_mode: Option<MySqlAccessMode>,
}

impl MySqlBeginOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_consistent_snapshot(mut self) -> Self {
        self.with_consistent_snapshot = true;
        self
    }

    #[must_use]
    pub fn access_mode(mut self, mode: MySqlAccessMode) -> Self {
        self.access_mode = Some(mode);
        self
    }
}

/// `None` leaves the server default in place.
#[derive(Debug, Clone, Default)]
pub struct MySqlCommitOptions {
    pub chain: Option<bool>,
    pub release: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct MySqlRollbackOptions {
    pub chain: Option<bool>,
    pub release: Option<bool>,
    /// Roll back to this savepoint and keep the transaction open. Overrides `chain` and
    /// `release`.
    pub savepoint: Option<String>,
}

impl MySqlRollbackOptions {
    #[must_use]
    pub fn to_savepoint(name: impl Into<String>) -> Self {
        Self {
            savepoint: Some(name.into()),
            ..Self::default()
        }
    }
}

fn quote(name: &str) -> String {
    quote_identifier(name, '`')
}

pub(crate) fn begin_statement(options: &MySqlBeginOptions) -> String {
    let mut characteristics = Vec::new();
    if options.with_consistent_snapshot {
        characteristics.push("WITH CONSISTENT SNAPSHOT");
    }
    match options.access_mode {
        Some(MySqlAccessMode::ReadWrite) => characteristics.push("READ WRITE"),
        Some(MySqlAccessMode::ReadOnly) => characteristics.push("READ ONLY"),
        None => {}
    }
    if characteristics.is_empty() {
        "START TRANSACTION".to_string()
    } else {
        format!("START TRANSACTION {}", characteristics.join(", "))
    }
}

fn completion(mut sql: String, chain: Option<bool>, release: Option<bool>) -> String {
    match chain {
        Some(true) => sql.push_str(" AND CHAIN"),
        Some(false) => sql.push_str(" AND NO CHAIN"),
        None => {}
    }
    match release {
        Some(true) => sql.push_str(" RELEASE"),
        Some(false) => sql.push_str(" NO RELEASE"),
        None => {}
    }
    sql
}

pub(crate) fn commit_statement(options: &MySqlCommitOptions) -> String {
    completion("COMMIT".to_string(), options.chain, options.release)
}

pub(crate) fn rollback_statement(options: &MySqlRollbackOptions) -> String {
    match &options.savepoint {
        Some(name) => format!("ROLLBACK TO SAVEPOINT {}", quote(name)),
        None => completion("ROLLBACK".to_string(), options.chain, options.release),
    }
}

/// A transaction opened with `START TRANSACTION` on a borrowed MySQL connection.
///
/// Dropping it while open flags the connection, which rolls back before its next statement.
pub struct MySqlTransaction<'c> {
    handle: TransactionHandle<&'c mut MySqlSession>,
}

impl<'c> MySqlTransaction<'c> {
    pub(crate) async fn begin(
        session: &'c mut MySqlSession,
        options: MySqlBeginOptions,
    ) -> Result<Self, SqlBridgeError> {
        session.conn.query_drop(begin_statement(&options)).await?;
        tracing::debug!(engine = MySql::NAME, ?options, "transaction started");
        Ok(Self {
            handle: TransactionHandle::open(MySql::NAME, session),
        })
    }

    fn conn(&mut self) -> Result<&mut Conn, SqlBridgeError> {
        Ok(&mut self.handle.get_mut()?.conn)
    }

    async fn statement(&mut self, sql: String) -> Result<(), SqlBridgeError> {
        self.conn()?.query_drop(sql).await?;
        Ok(())
    }
}

impl fmt::Debug for MySqlTransaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlTransaction")
            .field("state", &self.handle.state())
            .finish()
    }
}

impl_mysql_queriable!(MySqlTransaction<'c>, |this| this.conn()?);

#[async_trait]
impl TransactionQueriable for MySqlTransaction<'_> {
    fn state(&self) -> TransactionState {
        self.handle.state()
    }

    /// `chain: Some(true)` commits and keeps this transaction open as the chained one.
    async fn commit_transaction(
        &mut self,
        options: MySqlCommitOptions,
    ) -> Result<(), SqlBridgeError> {
        self.statement(commit_statement(&options)).await?;
        if options.chain != Some(true) {
            self.handle.finish(TransactionState::Committed)?;
            tracing::debug!(engine = MySql::NAME, "transaction committed");
        }
        Ok(())
    }

    async fn rollback_transaction(
        &mut self,
        options: MySqlRollbackOptions,
    ) -> Result<(), SqlBridgeError> {
        let sql = rollback_statement(&options);
        if options.savepoint.is_some() || options.chain == Some(true) {
            return self.statement(sql).await;
        }
        let session = self.handle.finish(TransactionState::RolledBack)?;
        let result = session.conn.query_drop(sql).await;
        if result.is_err() {
            session.pending_rollback = true;
        }
        tracing::debug!(engine = MySql::NAME, ok = result.is_ok(), "transaction rolled back");
        Ok(result?)
    }

    async fn create_savepoint(&mut self, name: &str) -> Result<(), SqlBridgeError> {
        self.statement(format!("SAVEPOINT {}", quote(name))).await
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<(), SqlBridgeError> {
        self.statement(format!("RELEASE SAVEPOINT {}", quote(name)))
            .await
    }
}

impl Drop for MySqlTransaction<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.handle.take_if_open() {
            session.pending_rollback = true;
            tracing::debug!(engine = MySql::NAME, "open transaction dropped; rollback deferred");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_statement_lists_characteristics() {
        assert_eq!(begin_statement(&MySqlBeginOptions::new()), "START TRANSACTION");
        assert_eq!(
            begin_statement(
                &MySqlBeginOptions::new()
                    .with_consistent_snapshot()
                    .access_mode(MySqlAccessMode::ReadOnly)
            ),
            "START TRANSACTION WITH CONSISTENT SNAPSHOT, READ ONLY"
        );
    }

    #[test]
    fn commit_statement_renders_chain_and_release() {
        assert_eq!(commit_statement(&MySqlCommitOptions::default()), "COMMIT");
        assert_eq!(
            commit_statement(&MySqlCommitOptions {
                chain: Some(false),
                release: Some(true),
            }),
            "COMMIT AND NO CHAIN RELEASE"
        );
    }

    #[test]
    fn savepoint_short_circuits_rollback_options() {
        let options = MySqlRollbackOptions {
            chain: Some(true),
            release: Some(false),
            savepoint: Some("sp`1".into()),
        };
        assert_eq!(rollback_statement(&options), "ROLLBACK TO SAVEPOINT `sp``1`");
        assert_eq!(
            rollback_statement(&MySqlRollbackOptions {
                chain: Some(true),
                ..MySqlRollbackOptions::default()
            }),
            "ROLLBACK AND CHAIN"
        );
    }
}
