//! Compiled, store-executable plans.

use crate::schema::EntitySchema;
use rusqlite::types::Value as SqlValue;

/// SQL text plus ordered positional bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub(crate) fn new(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }
}

/// Resolved pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub index: u64,
    pub size: u64,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub entity: &'static EntitySchema,
    pub select: Statement,
    /// Same filter, no window, no fetch joins.
    pub count: Statement,
    /// Write-lock acquisition run before `select`.
    pub lock: Option<Statement>,
    pub window: Option<PageWindow>,
    /// A to-many fetch join can repeat root rows; results need de-duplication.
    pub multiplies_rows: bool,
    /// The window is applied after de-duplication instead of in SQL.
    pub paginate_in_memory: bool,
    pub projection: bool,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
pub struct MutationPlan {
    pub entity: &'static EntitySchema,
    pub statement: Statement,
    /// Keys of the rows the mutation will touch, for cache eviction.
    pub affected_keys: Statement,
    /// Bind position of the `updated_at` value the audit interceptor fills.
    pub audit_slot: Option<usize>,
}
