use std::sync::Arc;

use futures_util::StreamExt;
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Statement, params_from_iter};

use crate::error::SqlBridgeError;
use crate::results::{ArrayRow, Columns, Row};
use crate::stream::{RowStream, stream_blocking};

use super::params::{from_sqlite_value, to_sqlite_values};
use super::{SharedSqliteConnection, SqliteExtension, SqliteParam};

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlBridgeError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlBridgeError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlBridgeError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

fn column_names(stmt: &Statement<'_>) -> Arc<Columns> {
    Columns::new(
        stmt.column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
    )
}

/// Read every column of `row` in projection order.
fn extract_values(
    row: &rusqlite::Row<'_>,
    width: usize,
) -> rusqlite::Result<ArrayRow<SqliteExtension>> {
    (0..width)
        .map(|idx| row.get::<_, Value>(idx).map(from_sqlite_value))
        .collect()
}

/// Run the statement and collect up to `limit` rows positionally.
fn collect_rows(
    conn: &rusqlite::Connection,
    sql: &str,
    params: Vec<Value>,
    limit: Option<usize>,
) -> Result<(Arc<Columns>, Vec<ArrayRow<SqliteExtension>>), SqlBridgeError> {
    let mut stmt = conn.prepare(sql)?;
    let columns = column_names(&stmt);
    let width = columns.len();
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut out = Vec::new();
    while limit.is_none_or(|max| out.len() < max) {
        match rows.next()? {
            Some(row) => out.push(extract_values(row, width)?),
            None => break,
        }
    }
    Ok((columns, out))
}

fn into_object_rows(
    columns: &Arc<Columns>,
    rows: Vec<ArrayRow<SqliteExtension>>,
) -> Result<Vec<Row<SqliteExtension>>, SqlBridgeError> {
    rows.into_iter()
        .map(|values| Row::new(Arc::clone(columns), values))
        .collect()
}

/// Step every statement in `sql` to completion, discarding any rows they return.
///
/// `params` bind to the first statement. The count covers every row the batch inserted,
/// updated or deleted.
fn execute_batch(
    conn: &rusqlite::Connection,
    sql: &str,
    params: Vec<Value>,
) -> Result<u64, SqlBridgeError> {
    let before = conn.total_changes();
    let mut batch = Batch::new(conn, sql);
    let mut params = Some(params);
    while let Some(mut stmt) = batch.next()? {
        let mut rows = stmt.query(params_from_iter(params.take().unwrap_or_default()))?;
        while rows.next()?.is_some() {}
    }
    Ok(conn.total_changes().saturating_sub(before))
}

pub(crate) async fn execute(
    conn: SharedSqliteConnection,
    sql: &str,
    params: &[SqliteParam],
) -> Result<Option<u64>, SqlBridgeError> {
    let sql = sql.to_owned();
    let values = to_sqlite_values(params);
    run_blocking(conn, move |guard| execute_batch(guard, &sql, values).map(Some)).await
}

pub(crate) async fn fetch_rows(
    conn: SharedSqliteConnection,
    sql: &str,
    params: &[SqliteParam],
    limit: Option<usize>,
) -> Result<Vec<Row<SqliteExtension>>, SqlBridgeError> {
    let sql = sql.to_owned();
    let values = to_sqlite_values(params);
    let (columns, rows) =
        run_blocking(conn, move |guard| collect_rows(guard, &sql, values, limit)).await?;
    into_object_rows(&columns, rows)
}

pub(crate) async fn fetch_array_rows(
    conn: SharedSqliteConnection,
    sql: &str,
    params: &[SqliteParam],
    limit: Option<usize>,
) -> Result<Vec<ArrayRow<SqliteExtension>>, SqlBridgeError> {
    let sql = sql.to_owned();
    let values = to_sqlite_values(params);
    let (_, rows) =
        run_blocking(conn, move |guard| collect_rows(guard, &sql, values, limit)).await?;
    Ok(rows)
}

/// Stream object rows straight off the native row iterator.
///
/// The worker holds the connection lock until the iterator is exhausted or the stream is
/// dropped.
pub(crate) fn stream_rows(
    conn: SharedSqliteConnection,
    sql: &str,
    params: &[SqliteParam],
) -> RowStream<'static, Row<SqliteExtension>> {
    let sql = sql.to_owned();
    let values = to_sqlite_values(params);
    stream_blocking(move |sink| {
        let guard = conn.blocking_lock();
        let mut stmt = match guard.prepare(&sql) {
            Ok(stmt) => stmt,
            Err(e) => {
                sink.send(Err(e.into()));
                return;
            }
        };
        let columns = column_names(&stmt);
        let width = columns.len();
        let rows = match stmt.query_map(params_from_iter(values), |row| extract_values(row, width))
        {
            Ok(rows) => rows,
            Err(e) => {
                sink.send(Err(e.into()));
                return;
            }
        };
        sink.send_iter(rows.map(|values| {
            values
                .map_err(SqlBridgeError::from)
                .and_then(|values| Row::new(Arc::clone(&columns), values))
        }));
    })
}

/// Map a row stream into the caller's row type.
pub(crate) fn convert_stream<'a, R, T, F>(
    stream: RowStream<'static, R>,
    convert: F,
) -> RowStream<'a, T>
where
    R: Send + 'static,
    T: Send + 'a,
    F: Fn(R) -> Result<T, SqlBridgeError> + Send + 'a,
{
    stream
        .map(move |item| item.and_then(&convert))
        .boxed()
}
