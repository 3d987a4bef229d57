use rusqlite::types::Value;

use super::{SqliteExtension, SqliteParam};

/// Convert a bound parameter into an owned `rusqlite` value.
#[must_use]
pub fn to_sqlite_value(param: &SqliteParam) -> Value {
    match param {
        SqliteParam::Null => Value::Null,
        SqliteParam::Bool(b) => Value::Integer(i64::from(*b)),
        SqliteParam::Int(i) => Value::Integer(*i),
        SqliteParam::Float(f) => Value::Real(*f),
        SqliteParam::Text(s) => Value::Text(s.clone()),
        SqliteParam::Extension(SqliteExtension::Blob(bytes)) => Value::Blob(bytes.clone()),
    }
}

/// Owned copies of `params`, ready to move onto a blocking worker.
#[must_use]
pub fn to_sqlite_values(params: &[SqliteParam]) -> Vec<Value> {
    params.iter().map(to_sqlite_value).collect()
}

/// Convert a column value read from `SQLite`.
#[must_use]
pub fn from_sqlite_value(value: Value) -> SqliteParam {
    match value {
        Value::Null => SqliteParam::Null,
        Value::Integer(i) => SqliteParam::Int(i),
        Value::Real(f) => SqliteParam::Float(f),
        Value::Text(s) => SqliteParam::Text(s),
        Value::Blob(b) => SqliteParam::Extension(SqliteExtension::Blob(b)),
    }
}
