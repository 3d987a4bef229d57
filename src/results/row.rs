use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::SqlBridgeError;
use crate::types::{FromParam, NoExtension, Param};

/// Positional result row: values in projection order.
pub type ArrayRow<X = NoExtension> = Vec<Param<X>>;

/// Column names of one result set, shared by all of its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    /// Build the shared column list. A repeated name resolves to its last position.
    #[must_use]
    pub fn new(names: Vec<String>) -> Arc<Self> {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Arc::new(Self { names, index })
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A result row keyed by column name.
///
/// Values keep the projection order for display, but equality compares by column name only.
#[derive(Debug, Clone)]
pub struct Row<X = NoExtension> {
    columns: Arc<Columns>,
    values: Vec<Param<X>>,
}

impl<X> Row<X> {
    /// Create a row from shared column names and its values.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConversionError` if the value count differs from the column count.
    pub fn new(columns: Arc<Columns>, values: Vec<Param<X>>) -> Result<Self, SqlBridgeError> {
        if columns.len() != values.len() {
            return Err(SqlBridgeError::ConversionError(format!(
                "row has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Build a standalone row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Param<X>>,
    {
        let (names, values): (Vec<String>, Vec<Param<X>>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: Columns::new(names),
            values,
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Param<X>> {
        self.columns
            .index_of(column)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Param<X>> {
        self.values.get(index)
    }

    /// Typed access to a column.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConversionError` if the column is missing or has another type.
    pub fn try_get<T: FromParam<X>>(&self, column: &str) -> Result<T, SqlBridgeError> {
        let value = self.get(column).ok_or_else(|| {
            SqlBridgeError::ConversionError(format!("no column named {column}"))
        })?;
        T::from_param(value)
            .map_err(|e| SqlBridgeError::ConversionError(format!("column {column}: {e}")))
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.columns.names()
    }

    #[must_use]
    pub fn values(&self) -> &[Param<X>] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param<X>)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn into_values(self) -> ArrayRow<X> {
        self.values
    }
}

impl<X: PartialEq> PartialEq for Row<X> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl<X: Serialize> Serialize for Row<X> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Conversion from an object row into the caller's row type.
pub trait FromRow<X>: Sized {
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConversionError` if the row does not fit `Self`.
    fn from_row(row: Row<X>) -> Result<Self, SqlBridgeError>;
}

impl<X> FromRow<X> for Row<X> {
    fn from_row(row: Row<X>) -> Result<Self, SqlBridgeError> {
        Ok(row)
    }
}

/// Conversion from a positional row into the caller's row type.
pub trait FromArrayRow<X>: Sized {
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConversionError` if the row does not fit `Self`.
    fn from_array_row(row: ArrayRow<X>) -> Result<Self, SqlBridgeError>;
}

impl<X> FromArrayRow<X> for ArrayRow<X> {
    fn from_array_row(row: ArrayRow<X>) -> Result<Self, SqlBridgeError> {
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type P = Param;

    fn john() -> Row {
        Row::from_pairs([("name", P::from("John")), ("age", P::from(42_i64))])
    }

    #[test]
    fn lookup_by_name_and_index() {
        let row = john();
        assert_eq!(row.get("name").and_then(Param::as_text), Some("John"));
        assert_eq!(row.get_by_index(1).and_then(Param::as_int), Some(42));
        assert!(row.get("missing").is_none());
        assert_eq!(row.try_get::<i64>("age").unwrap(), 42);
        assert!(row.try_get::<i64>("name").is_err());
    }

    #[test]
    fn equality_ignores_column_order() {
        let reordered: Row =
            Row::from_pairs([("age", P::from(42_i64)), ("name", P::from("John"))]);
        assert_eq!(john(), reordered);
        let other: Row = Row::from_pairs([("name", P::from("Jane")), ("age", P::from(36_i64))]);
        assert_ne!(john(), other);
    }

    #[test]
    fn repeated_column_resolves_to_last() {
        let columns = Columns::new(vec!["id".into(), "id".into()]);
        let row: Row = Row::new(columns, vec![P::Int(1), P::Int(2)]).unwrap();
        assert_eq!(row.get("id"), Some(&P::Int(2)));
        assert_eq!(row.into_values(), vec![P::Int(1), P::Int(2)]);
    }

    #[test]
    fn new_rejects_mismatched_width() {
        let columns = Columns::new(vec!["a".into()]);
        assert!(Row::<NoExtension>::new(columns, vec![]).is_err());
    }

    #[test]
    fn serializes_in_projection_order() {
        let json = serde_json::to_string(&john()).unwrap();
        assert_eq!(json, r#"{"name":"John","age":42}"#);
    }
}
