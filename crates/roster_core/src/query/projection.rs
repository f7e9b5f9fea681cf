//! Typed read models over projection rows.

use crate::query::error::QueryResult;
use crate::query::record::Record;
use crate::schema::EntitySchema;

/// A flat read model built from selected paths of one root entity.
pub trait Projection: Sized {
    /// Root schema the paths resolve against.
    fn schema() -> &'static EntitySchema;

    /// Paths to select, `field` or `relation.field`.
    fn paths() -> &'static [&'static str];

    fn from_record(record: &Record) -> QueryResult<Self>;
}
