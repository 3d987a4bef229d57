use std::sync::Arc;

use futures_util::StreamExt;
use mysql_async::Conn;
use mysql_async::prelude::Queryable;

use crate::error::SqlBridgeError;
use crate::results::{Columns, Row};
use crate::stream::{RowStream, empty_stream};

use super::params::{BINARY_CHARSET, from_mysql_value, to_mysql_params};
use super::{MySqlExtension, MySqlParam};

fn columns_of(row: &mysql_async::Row) -> Arc<Columns> {
    Columns::new(
        row.columns_ref()
            .iter()
            .map(|col| col.name_str().into_owned())
            .collect(),
    )
}

fn convert_row(
    columns: Arc<Columns>,
    mut row: mysql_async::Row,
) -> Result<Row<MySqlExtension>, SqlBridgeError> {
    let binary: Vec<bool> = row
        .columns_ref()
        .iter()
        .map(|col| col.character_set() == BINARY_CHARSET)
        .collect();
    let values = binary
        .into_iter()
        .enumerate()
        .map(|(idx, binary)| {
            let value = row
                .take::<mysql_async::Value, _>(idx)
                .unwrap_or(mysql_async::Value::NULL);
            from_mysql_value(value, binary)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Row::new(columns, values)
}

pub(crate) async fn execute(
    conn: &mut Conn,
    sql: &str,
    params: &[MySqlParam],
) -> Result<Option<u64>, SqlBridgeError> {
    let result = conn.exec_iter(sql, to_mysql_params(params)?).await?;
    let affected = result.affected_rows();
    result.drop_result().await?;
    Ok(Some(affected))
}

pub(crate) async fn fetch_rows(
    conn: &mut Conn,
    sql: &str,
    params: &[MySqlParam],
) -> Result<Vec<Row<MySqlExtension>>, SqlBridgeError> {
    let rows: Vec<mysql_async::Row> = conn.exec(sql, to_mysql_params(params)?).await?;
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns = columns_of(first);
    rows.into_iter()
        .map(|row| convert_row(Arc::clone(&columns), row))
        .collect()
}

pub(crate) async fn fetch_one(
    conn: &mut Conn,
    sql: &str,
    params: &[MySqlParam],
) -> Result<Option<Row<MySqlExtension>>, SqlBridgeError> {
    let row: Option<mysql_async::Row> = conn.exec_first(sql, to_mysql_params(params)?).await?;
    row.map(|row| convert_row(columns_of(&row), row)).transpose()
}

/// Stream rows off the connection as the caller polls. Statements without a result set yield
/// an empty stream.
pub(crate) async fn stream_rows<'a>(
    conn: &'a mut Conn,
    sql: &'a str,
    params: &[MySqlParam],
) -> Result<RowStream<'a, Row<MySqlExtension>>, SqlBridgeError> {
    let result = conn.exec_iter(sql, to_mysql_params(params)?).await?;
    if result.is_empty() {
        result.drop_result().await?;
        return Ok(empty_stream());
    }
    let Some(rows) = result.stream_and_drop::<mysql_async::Row>().await? else {
        return Ok(empty_stream());
    };
    let mut columns: Option<Arc<Columns>> = None;
    Ok(rows
        .map(move |item| -> Result<Row<MySqlExtension>, SqlBridgeError> {
            let row = item?;
            let columns = Arc::clone(columns.get_or_insert_with(|| columns_of(&row)));
            convert_row(columns, row)
        })
        .boxed())
}
