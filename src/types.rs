use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::SqlBridgeError;

/// A value bound as a positional statement parameter or read back from a result row.
///
/// `X` is the engine's extension type (timestamps, blobs, JSON and similar). Engine-agnostic
/// code uses the default [`NoExtension`], which cannot be constructed:
/// ```rust
/// use sql_bridge::prelude::*;
///
/// let params: Vec<Param> = vec![Param::from(1_i64), Param::from("alice"), Param::Null];
/// assert_eq!(params[1].as_text(), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Param<X = NoExtension> {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Engine-specific value
    Extension(X),
}

/// Extension type for rows and parameters that carry no engine-specific values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoExtension {}

impl Serialize for NoExtension {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        match *self {}
    }
}

impl<X> Param<X> {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let Param::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Param::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            Param::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Booleans, or the integers 0 and 1 engines without a boolean type return.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Param::Bool(value) => Some(*value),
            Param::Int(0) => Some(false),
            Param::Int(1) => Some(true),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Param::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_extension(&self) -> Option<&X> {
        if let Param::Extension(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Short name of the variant, used in conversion errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Param::Null => "null",
            Param::Bool(_) => "bool",
            Param::Int(_) => "int",
            Param::Float(_) => "float",
            Param::Text(_) => "text",
            Param::Extension(_) => "extension",
        }
    }
}

impl<X: Serialize> Serialize for Param<X> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Param::Null => serializer.serialize_none(),
            Param::Bool(value) => serializer.serialize_bool(*value),
            Param::Int(value) => serializer.serialize_i64(*value),
            Param::Float(value) => serializer.serialize_f64(*value),
            Param::Text(value) => serializer.serialize_str(value),
            Param::Extension(value) => value.serialize(serializer),
        }
    }
}

impl<X> From<bool> for Param<X> {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

impl<X> From<i64> for Param<X> {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl<X> From<i32> for Param<X> {
    fn from(value: i32) -> Self {
        Param::Int(i64::from(value))
    }
}

impl<X> From<f64> for Param<X> {
    fn from(value: f64) -> Self {
        Param::Float(value)
    }
}

impl<X> From<&str> for Param<X> {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl<X> From<String> for Param<X> {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl<X, T: Into<Param<X>>> From<Option<T>> for Param<X> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Param::Null, Into::into)
    }
}

/// Typed extraction of a single column value.
pub trait FromParam<X>: Sized {
    /// # Errors
    ///
    /// Returns `SqlBridgeError::ConversionError` when the value has another type.
    fn from_param(value: &Param<X>) -> Result<Self, SqlBridgeError>;
}

fn mismatch<X>(expected: &str, value: &Param<X>) -> SqlBridgeError {
    SqlBridgeError::ConversionError(format!("expected {expected}, found {}", value.kind()))
}

impl<X> FromParam<X> for i64 {
    fn from_param(value: &Param<X>) -> Result<Self, SqlBridgeError> {
        value.as_int().ok_or_else(|| mismatch("int", value))
    }
}

impl<X> FromParam<X> for f64 {
    fn from_param(value: &Param<X>) -> Result<Self, SqlBridgeError> {
        value.as_float().ok_or_else(|| mismatch("float", value))
    }
}

impl<X> FromParam<X> for bool {
    fn from_param(value: &Param<X>) -> Result<Self, SqlBridgeError> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl<X> FromParam<X> for String {
    fn from_param(value: &Param<X>) -> Result<Self, SqlBridgeError> {
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| mismatch("text", value))
    }
}

impl<X: Clone> FromParam<X> for Param<X> {
    fn from_param(value: &Param<X>) -> Result<Self, SqlBridgeError> {
        Ok(value.clone())
    }
}

impl<X, T: FromParam<X>> FromParam<X> for Option<T> {
    fn from_param(value: &Param<X>) -> Result<Self, SqlBridgeError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_param(value).map(Some)
        }
    }
}

/// Operations of the `Queriable` contract whose support varies per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    QueryMany,
    QueryArray,
    QueryOneArray,
    QueryManyArray,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::QueryMany,
        Operation::QueryArray,
        Operation::QueryOneArray,
        Operation::QueryManyArray,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::QueryMany => "query_many",
            Operation::QueryArray => "query_array",
            Operation::QueryOneArray => "query_one_array",
            Operation::QueryManyArray => "query_many_array",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Support matrix an engine declares for the optional `Queriable` operations.
///
/// `execute`, `query` and `query_one` are always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub query_many: bool,
    pub query_array: bool,
    pub query_one_array: bool,
    pub query_many_array: bool,
}

impl Capabilities {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            query_many: true,
            query_array: true,
            query_one_array: true,
            query_many_array: true,
        }
    }

    #[must_use]
    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::QueryMany => self.query_many,
            Operation::QueryArray => self.query_array,
            Operation::QueryOneArray => self.query_one_array,
            Operation::QueryManyArray => self.query_many_array,
        }
    }
}

/// Lifecycle of a transaction adapter. `Committed` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

impl TransactionState {
    #[must_use]
    pub fn is_open(self) -> bool {
        self == TransactionState::Open
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionState::Open => "open",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        })
    }
}
