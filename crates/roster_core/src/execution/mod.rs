//! Plan execution against an open transaction.
//!
//! # Responsibility
//! - Run compiled query and mutation plans and materialize typed results,
//!   whole entities or projections, paged or not.
//! - Keep a per-unit-of-work identity cache coherent with writes.
//! - Apply audit timestamps on insert, update and bulk update.
//!
//! # Invariants
//! - An executor only exists inside a caller-owned transaction; it never
//!   begins, commits or rolls back.
//! - A bulk mutation evicts every cached row its filter matched before it
//!   returns, so later reads in the same unit of work see stored values.
//! - A pessimistic read either obtains the store write lock within
//!   `lock_timeout_ms` or fails with `LockUnavailable`; it never waits
//!   indefinitely.
//! - Read-only plans never populate the identity cache.

pub mod audit;
mod cache;
pub mod entity;

use crate::config::StoreConfig;
use crate::query::error::is_lock_contention;
use crate::query::{
    MutationPlan, PageWindow, Projection, QueryDescriptor, QueryError, QueryPlan, QueryResult,
    Record, ResultPage, Statement, Translator, Value,
};
use crate::schema::EntitySchema;
use audit::{AuditInterceptor, TimestampAuditor};
use cache::IdentityCache;
use entity::Entity;
use log::{debug, error, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Transaction};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ptr;
use std::time::{Duration, Instant};

/// Runs plans inside one transaction.
pub struct Executor<'tx> {
    conn: &'tx Connection,
    config: StoreConfig,
    auditor: Box<dyn AuditInterceptor + 'tx>,
    cache: RefCell<IdentityCache>,
}

impl<'tx> Executor<'tx> {
    pub fn new(tx: &'tx Transaction<'_>, config: &StoreConfig) -> Self {
        let conn: &'tx Connection = tx;
        Self {
            conn,
            config: config.clone(),
            auditor: Box::new(TimestampAuditor::default()),
            cache: RefCell::new(IdentityCache::default()),
        }
    }

    pub fn with_auditor(mut self, auditor: impl AuditInterceptor + 'tx) -> Self {
        self.auditor = Box::new(auditor);
        self
    }

    /// Compiles `descriptor` against `T`'s schema.
    pub fn compile<T: Entity>(&self, descriptor: &QueryDescriptor) -> QueryResult<QueryPlan> {
        Translator::new(T::schema()).compile_query(descriptor)
    }

    /// Runs a read plan and wraps the result in a page.
    ///
    /// Paged plans run a second count query for `total_elements`, except
    /// when the window was applied in memory after de-duplication.
    pub fn run_query<T: Entity>(&self, plan: &QueryPlan) -> QueryResult<ResultPage<T>> {
        let started_at = Instant::now();
        let outcome = self.read::<T>(plan).and_then(|(content, in_memory_total)| {
            match plan.window {
                None => Ok(ResultPage::unpaged(content)),
                Some(window) => {
                    let total = match in_memory_total {
                        Some(total) => total,
                        None => self.count_with(&plan.count)?,
                    };
                    Ok(ResultPage::windowed(content, window, total))
                }
            }
        });
        log_outcome("query", plan.entity, started_at, outcome, |page| {
            page.content.len()
        })
    }

    pub fn run_list<T: Entity>(&self, plan: &QueryPlan) -> QueryResult<Vec<T>> {
        let started_at = Instant::now();
        let outcome = self.read::<T>(plan).map(|(content, _)| content);
        log_outcome("query", plan.entity, started_at, outcome, Vec::len)
    }

    /// At most one result; more than one is `NonUniqueResult`.
    pub fn run_single<T: Entity>(&self, plan: &QueryPlan) -> QueryResult<Option<T>> {
        let mut content = self.run_list::<T>(plan)?;
        match content.len() {
            0 => Ok(None),
            1 => Ok(content.pop()),
            count => Err(QueryError::NonUniqueResult { count }),
        }
    }

    /// Runs a projection plan; rows are keyed by the selected paths.
    pub fn run_projection(&self, plan: &QueryPlan) -> QueryResult<Vec<Record>> {
        let started_at = Instant::now();
        let outcome = self.project(plan);
        log_outcome("projection", plan.entity, started_at, outcome, Vec::len)
    }

    /// Runs a projection plan and builds `P` from every row.
    pub fn run_projection_as<P: Projection>(&self, plan: &QueryPlan) -> QueryResult<Vec<P>> {
        ensure_schema(plan.entity, P::schema())?;
        self.run_projection(plan)?
            .iter()
            .map(P::from_record)
            .collect()
    }

    /// Projection rows for the plan's window, with `total_elements` from the
    /// plan's count statement.
    pub fn run_projection_page(&self, plan: &QueryPlan) -> QueryResult<ResultPage<Record>> {
        let started_at = Instant::now();
        let outcome = self.project(plan).and_then(|rows| match plan.window {
            None => Ok(ResultPage::unpaged(rows)),
            Some(window) => {
                let total = self.count_with(&plan.count)?;
                Ok(ResultPage::windowed(rows, window, total))
            }
        });
        log_outcome("projection", plan.entity, started_at, outcome, |page| {
            page.content.len()
        })
    }

    /// Distinct root rows matching the plan's filter, ignoring any window.
    pub fn run_count(&self, plan: &QueryPlan) -> QueryResult<u64> {
        let started_at = Instant::now();
        let outcome = self.count_with(&plan.count);
        log_outcome("count", plan.entity, started_at, outcome, |_| 1)
    }

    /// Executes a bulk update/delete and returns the affected row count.
    pub fn run_mutation(&self, plan: &MutationPlan) -> QueryResult<usize> {
        let started_at = Instant::now();
        let outcome = self.mutate(plan);
        log_outcome("mutation", plan.entity, started_at, outcome, |affected| {
            *affected
        })
    }

    /// Primary-key lookup, served from the identity cache when present.
    pub fn find_by_key<T: Entity>(&self, key: &str) -> QueryResult<Option<T>> {
        let schema = T::schema();
        if let Some(record) = self.cache.borrow().get(schema.table, key) {
            debug!(
                "event=cache_hit module=exec entity={} key={key}",
                schema.name
            );
            return T::from_record(record).map(Some);
        }
        let descriptor = QueryDescriptor::new().eq(schema.key_field().name, key);
        let plan = Translator::new(schema).compile_query(&descriptor)?;
        self.run_single(&plan)
    }

    /// Inserts a new row, stamping `created_at`/`updated_at` first.
    pub fn persist<T: Entity>(&self, entity: &mut T) -> QueryResult<()> {
        let started_at = Instant::now();
        let schema = T::schema();
        self.auditor.on_create(entity.audit_mut());
        let outcome = Translator::new(schema)
            .compile_insert(&entity.to_values())
            .and_then(|statement| self.execute(&statement));
        log_outcome("persist", schema, started_at, outcome, |rows| *rows)?;
        self.cache
            .borrow_mut()
            .put(schema.table, entity.key(), entity.to_record());
        Ok(())
    }

    /// Writes every mutable column of an existing row and drops its cache
    /// entry. Returns rows changed (0 when the key is not stored).
    pub fn merge<T: Entity>(&self, entity: &mut T) -> QueryResult<usize> {
        let started_at = Instant::now();
        let schema = T::schema();
        self.auditor.on_update(entity.audit_mut());
        let key = entity.key();
        let outcome = Translator::new(schema)
            .compile_update_by_key(&key, &entity.to_values())
            .and_then(|statement| self.execute(&statement));
        let changed = log_outcome("merge", schema, started_at, outcome, |rows| *rows)?;
        // `created_at` is not rewritten, so the in-memory value may be stale.
        self.cache.borrow_mut().evict(schema.table, &key);
        Ok(changed)
    }

    /// Deletes one row by key. Returns rows removed.
    pub fn remove<T: Entity>(&self, key: &str) -> QueryResult<usize> {
        let started_at = Instant::now();
        let schema = T::schema();
        let statement = Translator::new(schema).compile_delete_by_key(key);
        let outcome = self.execute(&statement);
        let removed = log_outcome("remove", schema, started_at, outcome, |rows| *rows)?;
        self.cache.borrow_mut().evict(schema.table, key);
        Ok(removed)
    }

    /// Drops every cached row.
    pub fn clear(&self) {
        let evicted = self.cache.borrow_mut().clear();
        debug!("event=cache_clear module=exec evicted={evicted}");
    }

    pub fn is_cached<T: Entity>(&self, key: &str) -> bool {
        self.cache.borrow().contains(T::schema().table, key)
    }

    fn read<T: Entity>(&self, plan: &QueryPlan) -> QueryResult<(Vec<T>, Option<u64>)> {
        ensure_entity::<T>(plan.entity)?;
        if plan.projection {
            return Err(QueryError::invalid(
                "projection plans must run through run_projection",
            ));
        }
        self.acquire_lock(plan)?;
        let records = self.fetch_records(&plan.select)?;
        let content = self.materialize::<T>(plan, records)?;
        match (plan.window, plan.paginate_in_memory) {
            (Some(window), true) => {
                warn!(
                    "event=query module=exec status=in_memory_window entity={} rows={}",
                    plan.entity.name,
                    content.len()
                );
                let total = u64::try_from(content.len()).unwrap_or(u64::MAX);
                Ok((slice_window(content, window), Some(total)))
            }
            _ => Ok((content, None)),
        }
    }

    fn project(&self, plan: &QueryPlan) -> QueryResult<Vec<Record>> {
        if !plan.projection {
            return Err(QueryError::invalid(
                "plan selects whole entities; use run_query or run_list",
            ));
        }
        self.acquire_lock(plan)?;
        self.fetch_records(&plan.select)
    }

    fn materialize<T: Entity>(&self, plan: &QueryPlan, records: Vec<Record>) -> QueryResult<Vec<T>> {
        let table = plan.entity.table;
        let mut items: Vec<T> = Vec::with_capacity(records.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut cache = self.cache.borrow_mut();
        for record in records {
            let entity = T::from_record(&record)?;
            let key = entity.key();
            if !plan.read_only {
                cache.put(table, key.clone(), record.root_only());
            }
            if plan.multiplies_rows {
                if let Some(&position) = positions.get(&key) {
                    items[position].absorb(entity);
                    continue;
                }
                positions.insert(key, items.len());
            }
            items.push(entity);
        }
        Ok(items)
    }

    fn mutate(&self, plan: &MutationPlan) -> QueryResult<usize> {
        let keys = self.fetch_keys(&plan.affected_keys)?;
        let mut params = plan.statement.params.clone();
        if let Some(slot) = plan.audit_slot.and_then(|slot| params.get_mut(slot)) {
            *slot = SqlValue::Integer(self.auditor.bulk_update_stamp());
        }
        let affected = self
            .conn
            .execute(&plan.statement.sql, params_from_iter(params.iter()))?;
        let evicted = self.cache.borrow_mut().evict_all(plan.entity.table, &keys);
        debug!(
            "event=cache_evict module=exec entity={} matched={} evicted={evicted}",
            plan.entity.name,
            keys.len()
        );
        Ok(affected)
    }

    /// Takes the store write lock on the plan's matching rows, waiting at
    /// most `lock_timeout_ms`. The connection's own busy timeout is restored
    /// afterwards, whatever config it was opened with.
    fn acquire_lock(&self, plan: &QueryPlan) -> QueryResult<()> {
        let Some(lock) = &plan.lock else {
            return Ok(());
        };
        let started_at = Instant::now();
        let previous = self.current_busy_timeout()?;
        self.conn.busy_timeout(self.config.lock_timeout())?;
        let outcome = self
            .conn
            .execute(&lock.sql, params_from_iter(lock.params.iter()));
        self.conn.busy_timeout(previous)?;
        match outcome {
            Ok(rows) => {
                debug!(
                    "event=lock module=exec status=ok entity={} rows={rows} duration_ms={}",
                    plan.entity.name,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) if is_lock_contention(&err) => {
                warn!(
                    "event=lock module=exec status=error error_code=lock_unavailable entity={} timeout_ms={}",
                    plan.entity.name, self.config.lock_timeout_ms
                );
                Err(QueryError::LockUnavailable {
                    timeout_ms: self.config.lock_timeout_ms,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn current_busy_timeout(&self) -> QueryResult<Duration> {
        let millis: i64 = self
            .conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }

    fn fetch_records(&self, statement: &Statement) -> QueryResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&statement.sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (index, name) in names.iter().enumerate() {
                let value = Value::from_sql_ref(row.get_ref(index)?).ok_or_else(|| {
                    QueryError::InvalidData(format!(
                        "column `{name}` holds an unsupported storage class"
                    ))
                })?;
                record.insert(name.clone(), value);
            }
            records.push(record);
        }
        Ok(records)
    }

    fn fetch_keys(&self, statement: &Statement) -> QueryResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&statement.sql)?;
        let keys = stmt
            .query_map(params_from_iter(statement.params.iter()), |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn count_with(&self, statement: &Statement) -> QueryResult<u64> {
        let total: i64 = self.conn.query_row(
            &statement.sql,
            params_from_iter(statement.params.iter()),
            |row| row.get(0),
        )?;
        u64::try_from(total)
            .map_err(|_| QueryError::InvalidData(format!("negative row count {total}")))
    }

    fn execute(&self, statement: &Statement) -> QueryResult<usize> {
        Ok(self
            .conn
            .execute(&statement.sql, params_from_iter(statement.params.iter()))?)
    }
}

fn ensure_entity<T: Entity>(planned: &'static EntitySchema) -> QueryResult<()> {
    ensure_schema(planned, T::schema())
}

fn ensure_schema(planned: &'static EntitySchema, wanted: &'static EntitySchema) -> QueryResult<()> {
    if ptr::eq(planned, wanted) {
        return Ok(());
    }
    Err(QueryError::invalid(format!(
        "plan compiled for {} cannot materialize {}",
        planned.name, wanted.name
    )))
}

fn slice_window<T>(content: Vec<T>, window: PageWindow) -> Vec<T> {
    let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
    let size = usize::try_from(window.size).unwrap_or(usize::MAX);
    content.into_iter().skip(offset).take(size).collect()
}

fn log_outcome<R>(
    event: &str,
    entity: &EntitySchema,
    started_at: Instant,
    outcome: QueryResult<R>,
    rows: impl FnOnce(&R) -> usize,
) -> QueryResult<R> {
    let duration_ms = started_at.elapsed().as_millis();
    match &outcome {
        Ok(value) => {
            debug!(
                "event={event} module=exec status=ok entity={} rows={} duration_ms={duration_ms}",
                entity.name,
                rows(value)
            );
        }
        Err(err) => {
            error!(
                "event={event} module=exec status=error entity={} error_code={} duration_ms={duration_ms} error={err}",
                entity.name,
                err.code()
            );
        }
    }
    outcome
}
