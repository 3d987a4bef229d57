use std::pin::pin;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures_util::StreamExt;
use serde_json::Value;
use tokio_postgres::GenericClient;
use tokio_postgres::types::Type;

use crate::error::SqlBridgeError;
use crate::results::{ArrayRow, Columns, Row};
use crate::stream::RowStream;
use crate::types::Param;

use super::params::param_refs;
use super::{PostgresExtension, PostgresParam};

/// Column names of a native row, in projection order.
fn columns_of(row: &tokio_postgres::Row) -> Arc<Columns> {
    Columns::new(
        row.columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect(),
    )
}

/// Read one column of a native row into a `Param`.
///
/// # Errors
///
/// Returns `SqlBridgeError::PostgresError` if the column cannot be decoded.
pub fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<PostgresParam, SqlBridgeError> {
    let ty = row.columns()[idx].type_();
    let value = match *ty {
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(|v| Param::Int(i64::from(v))),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(|v| Param::Int(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Param::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| Param::Float(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Param::Float),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Param::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|v| Param::Extension(PostgresExtension::Timestamp(v))),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| Param::Extension(PostgresExtension::Timestamp(v.naive_utc()))),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| Param::Extension(PostgresExtension::Date(v))),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)?
            .map(|v| Param::Extension(PostgresExtension::Json(v))),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map(|v| Param::Extension(PostgresExtension::Bytes(v))),
        // Everything else must decode as text.
        _ => row.try_get::<_, Option<String>>(idx)?.map(Param::Text),
    };
    Ok(value.unwrap_or(Param::Null))
}

pub(crate) fn extract_values(
    row: &tokio_postgres::Row,
) -> Result<ArrayRow<PostgresExtension>, SqlBridgeError> {
    (0..row.len()).map(|idx| extract_value(row, idx)).collect()
}

fn into_object_rows(
    rows: &[tokio_postgres::Row],
) -> Result<Vec<Row<PostgresExtension>>, SqlBridgeError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns = columns_of(first);
    rows.iter()
        .map(|row| Row::new(Arc::clone(&columns), extract_values(row)?))
        .collect()
}

pub(crate) async fn execute<C>(
    client: &C,
    sql: &str,
    params: &[PostgresParam],
) -> Result<Option<u64>, SqlBridgeError>
where
    C: GenericClient + Sync,
{
    let affected = client.execute(sql, &param_refs(params)).await?;
    Ok(Some(affected))
}

async fn fetch<C>(
    client: &C,
    sql: &str,
    params: &[PostgresParam],
) -> Result<Vec<tokio_postgres::Row>, SqlBridgeError>
where
    C: GenericClient + Sync,
{
    Ok(client.query(sql, &param_refs(params)).await?)
}

/// First row only; the rest of the result is discarded without being decoded.
async fn fetch_first<C>(
    client: &C,
    sql: &str,
    params: &[PostgresParam],
) -> Result<Option<tokio_postgres::Row>, SqlBridgeError>
where
    C: GenericClient + Sync,
{
    let mut rows = pin!(client.query_raw(sql, params.iter()).await?);
    Ok(rows.next().await.transpose()?)
}

pub(crate) async fn fetch_rows<C>(
    client: &C,
    sql: &str,
    params: &[PostgresParam],
) -> Result<Vec<Row<PostgresExtension>>, SqlBridgeError>
where
    C: GenericClient + Sync,
{
    into_object_rows(&fetch(client, sql, params).await?)
}

pub(crate) async fn fetch_one<C>(
    client: &C,
    sql: &str,
    params: &[PostgresParam],
) -> Result<Option<Row<PostgresExtension>>, SqlBridgeError>
where
    C: GenericClient + Sync,
{
    fetch_first(client, sql, params)
        .await?
        .map(|row| Row::new(columns_of(&row), extract_values(&row)?))
        .transpose()
}

pub(crate) async fn fetch_array_rows<C>(
    client: &C,
    sql: &str,
    params: &[PostgresParam],
) -> Result<Vec<ArrayRow<PostgresExtension>>, SqlBridgeError>
where
    C: GenericClient + Sync,
{
    fetch(client, sql, params)
        .await?
        .iter()
        .map(extract_values)
        .collect()
}

pub(crate) async fn fetch_one_array<C>(
    client: &C,
    sql: &str,
    params: &[PostgresParam],
) -> Result<Option<ArrayRow<PostgresExtension>>, SqlBridgeError>
where
    C: GenericClient + Sync,
{
    fetch_first(client, sql, params)
        .await?
        .as_ref()
        .map(extract_values)
        .transpose()
}

/// Start a portal-backed row stream. Rows are decoded as the caller polls.
pub(crate) async fn stream_raw<C>(
    client: &C,
    sql: &str,
    params: &[PostgresParam],
) -> Result<tokio_postgres::RowStream, SqlBridgeError>
where
    C: GenericClient + Sync,
{
    Ok(client.query_raw(sql, params.iter()).await?)
}

/// Decode a native stream into object rows, sharing one column index across the stream.
pub(crate) fn object_stream<'a, T, F>(rows: tokio_postgres::RowStream, convert: F) -> RowStream<'a, T>
where
    T: Send + 'a,
    F: Fn(Row<PostgresExtension>) -> Result<T, SqlBridgeError> + Send + 'a,
{
    let mut columns: Option<Arc<Columns>> = None;
    rows.map(move |item| -> Result<T, SqlBridgeError> {
        let row = item?;
        let columns = Arc::clone(columns.get_or_insert_with(|| columns_of(&row)));
        convert(Row::new(columns, extract_values(&row)?)?)
    })
    .boxed()
}

pub(crate) fn array_stream<'a, T, F>(rows: tokio_postgres::RowStream, convert: F) -> RowStream<'a, T>
where
    T: Send + 'a,
    F: Fn(ArrayRow<PostgresExtension>) -> Result<T, SqlBridgeError> + Send + 'a,
{
    rows.map(move |item| -> Result<T, SqlBridgeError> { convert(extract_values(&item?)?) })
        .boxed()
}
