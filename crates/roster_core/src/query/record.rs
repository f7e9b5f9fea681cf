//! Untyped result rows keyed by descriptor path.

use crate::query::error::{QueryError, QueryResult};
use crate::query::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One result row. Keys are descriptor paths (`username`, `team.name`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, value: Value) {
        self.values.insert(path.into(), value);
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(path, value)| (path.as_str(), value))
    }

    /// Keeps only root columns (paths without a relation prefix).
    pub fn root_only(&self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(path, _)| !path.contains('.'))
                .map(|(path, value)| (path.clone(), value.clone()))
                .collect(),
        }
    }

    pub fn text(&self, path: &str) -> QueryResult<String> {
        self.opt_text(path)?
            .ok_or_else(|| QueryError::InvalidData(format!("column `{path}` is null")))
    }

    pub fn opt_text(&self, path: &str) -> QueryResult<Option<String>> {
        match self.require(path)? {
            Value::Null => Ok(None),
            Value::Text(value) => Ok(Some(value.clone())),
            other => Err(QueryError::InvalidData(format!(
                "column `{path}` expected text, got {other:?}"
            ))),
        }
    }

    pub fn integer(&self, path: &str) -> QueryResult<i64> {
        match self.require(path)? {
            Value::Integer(value) => Ok(*value),
            other => Err(QueryError::InvalidData(format!(
                "column `{path}` expected integer, got {other:?}"
            ))),
        }
    }

    pub fn uuid(&self, path: &str) -> QueryResult<Uuid> {
        let text = self.text(path)?;
        parse_uuid(path, &text)
    }

    pub fn opt_uuid(&self, path: &str) -> QueryResult<Option<Uuid>> {
        match self.opt_text(path)? {
            Some(text) => parse_uuid(path, &text).map(Some),
            None => Ok(None),
        }
    }

    fn require(&self, path: &str) -> QueryResult<&Value> {
        self.values
            .get(path)
            .ok_or_else(|| QueryError::InvalidData(format!("column `{path}` missing from row")))
    }
}

fn parse_uuid(path: &str, text: &str) -> QueryResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| QueryError::InvalidData(format!("invalid uuid value `{text}` in `{path}`")))
}

#[cfg(test)]
mod tests {
    use super::Record;
    use crate::query::value::Value;

    #[test]
    fn root_only_drops_relation_columns() {
        let mut record = Record::new();
        record.insert("username", Value::from("m1"));
        record.insert("team.name", Value::from("teamA"));

        let root = record.root_only();
        assert!(root.contains("username"));
        assert!(!root.contains("team.name"));
    }

    #[test]
    fn typed_getters_reject_mismatches() {
        let mut record = Record::new();
        record.insert("age", Value::from("ten"));
        record.insert("id", Value::from("not-a-uuid"));

        assert!(record.integer("age").is_err());
        assert!(record.uuid("id").is_err());
        assert!(record.text("missing").is_err());
    }
}
