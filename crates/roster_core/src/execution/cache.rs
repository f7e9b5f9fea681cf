//! Per-executor identity cache of root rows.

use crate::query::Record;
use std::collections::HashMap;

/// Root-only rows keyed by `(table, key)`.
///
/// Entries are replaced on every load and write of the same key and removed
/// when a bulk mutation or delete touches the key.
#[derive(Debug, Default)]
pub(crate) struct IdentityCache {
    rows: HashMap<(&'static str, String), Record>,
}

impl IdentityCache {
    pub(crate) fn get(&self, table: &'static str, key: &str) -> Option<&Record> {
        self.rows.get(&(table, key.to_string()))
    }

    pub(crate) fn contains(&self, table: &'static str, key: &str) -> bool {
        self.get(table, key).is_some()
    }

    pub(crate) fn put(&mut self, table: &'static str, key: String, record: Record) {
        self.rows.insert((table, key), record);
    }

    pub(crate) fn evict(&mut self, table: &'static str, key: &str) -> bool {
        self.rows.remove(&(table, key.to_string())).is_some()
    }

    pub(crate) fn evict_all<'k>(
        &mut self,
        table: &'static str,
        keys: impl IntoIterator<Item = &'k String>,
    ) -> usize {
        keys.into_iter().filter(|key| self.evict(table, key)).count()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let evicted = self.rows.len();
        self.rows.clear();
        evicted
    }
}
