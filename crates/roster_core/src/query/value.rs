//! Descriptor values and their SQLite bindings.

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language-agnostic scalar (or list of scalars) used in descriptors,
/// mutations and projected records.
///
/// Serialized untagged so a JSON descriptor can write `"age": 20` or
/// `"value": ["a", "b"]` directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Converts a scalar into a bind value. Lists have no single binding.
    pub(crate) fn to_sql(&self) -> Option<SqlValue> {
        match self {
            Self::Null => Some(SqlValue::Null),
            Self::Integer(value) => Some(SqlValue::Integer(*value)),
            Self::Text(value) => Some(SqlValue::Text(value.clone())),
            Self::List(_) => None,
        }
    }

    /// Reads one result column; `None` for storage classes this crate never
    /// writes (REAL, BLOB).
    pub(crate) fn from_sql_ref(value: ValueRef<'_>) -> Option<Self> {
        match value {
            ValueRef::Null => Some(Self::Null),
            ValueRef::Integer(value) => Some(Self::Integer(value)),
            ValueRef::Text(bytes) => Some(Self::Text(String::from_utf8_lossy(bytes).into_owned())),
            ValueRef::Real(_) | ValueRef::Blob(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}
