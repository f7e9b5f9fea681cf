//! Mapping between stored rows and domain records.

use crate::model::audit::AuditStamp;
use crate::query::{QueryResult, Record, Value};
use crate::schema::EntitySchema;

/// A domain record the executor can load, persist and cache.
pub trait Entity: Sized {
    fn schema() -> &'static EntitySchema;

    /// Text form of the primary key, as stored.
    fn key(&self) -> String;

    /// Builds a value from one result row. Fetched relation columns appear
    /// under `relation.field` paths.
    fn from_record(record: &Record) -> QueryResult<Self>;

    /// Root `(field, value)` pairs covering every stored column.
    fn to_values(&self) -> Vec<(&'static str, Value)>;

    fn audit_mut(&mut self) -> &mut AuditStamp;

    /// Folds a repeated row of the same key (from a to-many fetch) into
    /// `self`.
    fn absorb(&mut self, _duplicate: Self) {}

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        for (path, value) in self.to_values() {
            record.insert(path, value);
        }
        record
    }
}
