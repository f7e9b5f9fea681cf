//! Descriptor → SQL plan translation.
//!
//! # Responsibility
//! - Resolve descriptor paths against a static schema.
//! - Compile reads, counts, lock acquisition, bulk mutations and single-row
//!   writes into positional-parameter SQL.
//!
//! # Invariants
//! - Every failure here is `InvalidDescriptor` and happens before the store
//!   is touched.
//! - Values are always bound, never spliced into SQL text.
//! - Read ordering ends with the root `rowid`, so ties keep insertion order.
//! - Relation paths in filters/sort/projections go through to-one relations
//!   only; a to-one LEFT JOIN never repeats root rows.

use crate::query::descriptor::{
    Assignment, Direction, MutationDescriptor, MutationKind, Operator, Pagination, Predicate,
    QueryDescriptor,
};
use crate::query::error::{QueryError, QueryResult};
use crate::query::plan::{MutationPlan, PageWindow, QueryPlan, Statement};
use crate::query::value::Value;
use crate::schema::{parse_field_path, Cardinality, EntitySchema, FieldDef, FieldKind, RelationDef};
use rusqlite::types::Value as SqlValue;

const AUDIT_CREATED: &str = "created_at";
const AUDIT_UPDATED: &str = "updated_at";

/// Compiles descriptors for one root entity.
#[derive(Debug, Clone, Copy)]
pub struct Translator {
    schema: &'static EntitySchema,
}

impl Translator {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Compiles a read descriptor into select/count/lock statements.
    pub fn compile_query(&self, descriptor: &QueryDescriptor) -> QueryResult<QueryPlan> {
        if descriptor.read_only && descriptor.lock.is_some() {
            return Err(QueryError::invalid(
                "a read-only query cannot request a write lock",
            ));
        }
        let projection = !descriptor.select.is_empty();
        let fetch = self.fetch_names(descriptor)?;
        if projection && !fetch.is_empty() {
            return Err(QueryError::invalid(
                "fetch hints cannot be combined with a projection",
            ));
        }

        let window = resolve_window(descriptor.page)?;
        let mut scope = Scope::qualified(self.schema);

        let (where_sql, where_params) = render_where(&mut scope, &descriptor.predicates)?;
        let filter_joins = scope.joins.clone();

        let mut order_terms = Vec::with_capacity(descriptor.sort.len() + 2);
        for order in &descriptor.sort {
            let column = scope.resolve(&order.field, "sort")?;
            let direction = match order.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            order_terms.push(format!("{} {direction}", column.sql));
        }

        let mut columns = Vec::new();
        let mut to_many_alias = None;
        if projection {
            for path in &descriptor.select {
                let column = scope.resolve(path, "projection")?;
                columns.push(format!("{} AS \"{path}\"", column.sql));
            }
        } else {
            push_entity_columns(&mut columns, self.schema.alias, self.schema, None);
            let mut fetched: Vec<&str> = Vec::new();
            for name in fetch {
                if fetched.contains(&name) {
                    continue;
                }
                let relation = self.schema.relation(name).ok_or_else(|| {
                    QueryError::invalid(format!(
                        "unknown relation `{name}` on {}",
                        self.schema.name
                    ))
                })?;
                if relation.cardinality == Cardinality::ToMany && to_many_alias.is_some() {
                    return Err(QueryError::invalid(
                        "at most one to-many relation can be fetched per query",
                    ));
                }
                let alias = scope.join(relation);
                push_entity_columns(&mut columns, &alias, relation.target, Some(relation.name));
                if relation.cardinality == Cardinality::ToMany {
                    to_many_alias = Some(alias);
                }
                fetched.push(name);
            }
        }

        let root = self.schema.alias;
        order_terms.push(format!("{root}.rowid ASC"));
        if let Some(alias) = &to_many_alias {
            order_terms.push(format!("{alias}.rowid ASC"));
        }

        let multiplies_rows = to_many_alias.is_some();
        let paginate_in_memory = multiplies_rows && window.is_some();

        let mut select_sql = format!(
            "SELECT {} FROM {} {root}{}{} ORDER BY {}",
            columns.join(", "),
            self.schema.table,
            render_joins(root, &scope.joins),
            where_sql,
            order_terms.join(", ")
        );
        let mut select_params = where_params.clone();
        if let (Some(window), false) = (window, paginate_in_memory) {
            select_sql.push_str(" LIMIT ? OFFSET ?");
            select_params.push(SqlValue::Integer(to_bind_int(window.size)?));
            select_params.push(SqlValue::Integer(to_bind_int(window.offset)?));
        }

        let key_column = self.schema.key_field().column;
        let filter_from = format!(
            "FROM {} {root}{}{}",
            self.schema.table,
            render_joins(root, &filter_joins),
            where_sql
        );
        let count = Statement::new(
            format!("SELECT COUNT(DISTINCT {root}.{key_column}) {filter_from}"),
            where_params.clone(),
        );

        let lock = descriptor.lock.map(|_| {
            let touch_column = self
                .schema
                .fields
                .iter()
                .find(|field| field.kind != FieldKind::Key)
                .map_or(key_column, |field| field.column);
            Statement::new(
                format!(
                    "UPDATE {table} SET {touch_column} = {touch_column} WHERE {key_column} IN (SELECT {root}.{key_column} {filter_from})",
                    table = self.schema.table
                ),
                where_params.clone(),
            )
        });

        Ok(QueryPlan {
            entity: self.schema,
            select: Statement::new(select_sql, select_params),
            count,
            lock,
            window,
            multiplies_rows,
            paginate_in_memory,
            projection,
            read_only: descriptor.read_only,
        })
    }

    /// Compiles a bulk update/delete. Filters reference root fields only.
    pub fn compile_mutation(&self, descriptor: &MutationDescriptor) -> QueryResult<MutationPlan> {
        let mut scope = Scope::unqualified(self.schema);
        let table = self.schema.table;

        let mut set_terms = Vec::new();
        let mut params = Vec::new();
        let mut audit_slot = None;
        if let MutationKind::Update { assignments } = &descriptor.kind {
            if assignments.is_empty() {
                return Err(QueryError::invalid("bulk update needs at least one assignment"));
            }
            for assignment in assignments {
                let (term, value) = self.render_assignment(assignment)?;
                set_terms.push(term);
                params.push(value);
            }
            if self.schema.has_audit_columns() {
                set_terms.push(format!("{AUDIT_UPDATED} = ?"));
                audit_slot = Some(params.len());
                params.push(SqlValue::Null);
            }
        }

        let (where_sql, where_params) = render_where(&mut scope, &descriptor.predicates)?;
        params.extend(where_params.iter().cloned());

        let sql = match &descriptor.kind {
            MutationKind::Update { .. } => {
                format!("UPDATE {table} SET {}{where_sql}", set_terms.join(", "))
            }
            MutationKind::Delete => format!("DELETE FROM {table}{where_sql}"),
        };
        let affected_keys = Statement::new(
            format!(
                "SELECT {} FROM {table}{where_sql}",
                self.schema.key_field().column
            ),
            where_params,
        );

        Ok(MutationPlan {
            entity: self.schema,
            statement: Statement::new(sql, params),
            affected_keys,
            audit_slot,
        })
    }

    /// `INSERT` of one full row given `(field name, value)` pairs.
    pub fn compile_insert(&self, values: &[(&str, Value)]) -> QueryResult<Statement> {
        let mut columns = Vec::with_capacity(values.len());
        let mut params = Vec::with_capacity(values.len());
        for (name, value) in values {
            let field = self.root_field(name)?;
            columns.push(field.column);
            params.push(bindable(name, value)?);
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        Ok(Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                self.schema.table,
                columns.join(", ")
            ),
            params,
        ))
    }

    /// `UPDATE ... WHERE key = ?` of every given field except the key and
    /// `created_at`, which is immutable after insert.
    pub fn compile_update_by_key(&self, key: &str, values: &[(&str, Value)]) -> QueryResult<Statement> {
        let mut terms = Vec::new();
        let mut params = Vec::new();
        for (name, value) in values {
            let field = self.root_field(name)?;
            if field.kind == FieldKind::Key || field.name == AUDIT_CREATED {
                continue;
            }
            terms.push(format!("{} = ?", field.column));
            params.push(bindable(name, value)?);
        }
        if terms.is_empty() {
            return Err(QueryError::invalid("update has no writable fields"));
        }
        params.push(SqlValue::Text(key.to_string()));
        Ok(Statement::new(
            format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.schema.table,
                terms.join(", "),
                self.schema.key_field().column
            ),
            params,
        ))
    }

    pub fn compile_delete_by_key(&self, key: &str) -> Statement {
        Statement::new(
            format!(
                "DELETE FROM {} WHERE {} = ?",
                self.schema.table,
                self.schema.key_field().column
            ),
            vec![SqlValue::Text(key.to_string())],
        )
    }

    /// Explicit fetch hints followed by the named graph's relations.
    fn fetch_names<'d>(&self, descriptor: &'d QueryDescriptor) -> QueryResult<Vec<&'d str>> {
        let mut names: Vec<&str> = descriptor.fetch.iter().map(String::as_str).collect();
        if let Some(name) = &descriptor.graph {
            let graph = self.schema.graph(name).ok_or_else(|| {
                QueryError::invalid(format!(
                    "unknown entity graph `{name}` on {}",
                    self.schema.name
                ))
            })?;
            names.extend(graph.fetch.iter().copied());
        }
        Ok(names)
    }

    fn root_field(&self, name: &str) -> QueryResult<&'static FieldDef> {
        self.schema.fields.iter().find(|field| field.name == name).ok_or_else(|| {
            QueryError::invalid(format!("unknown field `{name}` on {}", self.schema.name))
        })
    }

    fn render_assignment(&self, assignment: &Assignment) -> QueryResult<(String, SqlValue)> {
        let name = match assignment {
            Assignment::Set { field, .. } | Assignment::Increment { field, .. } => field,
        };
        let field = self.root_field(name)?;
        if field.kind == FieldKind::Key {
            return Err(QueryError::invalid(format!("key field `{name}` cannot be assigned")));
        }
        if field.name == AUDIT_CREATED || field.name == AUDIT_UPDATED {
            return Err(QueryError::invalid(format!(
                "audit field `{name}` is maintained by the store"
            )));
        }

        match assignment {
            Assignment::Set { value, .. } => {
                let bound = if value.is_null() && field.kind == FieldKind::Reference {
                    SqlValue::Null
                } else {
                    check_scalar(field, name, value)?
                };
                Ok((format!("{} = ?", field.column), bound))
            }
            Assignment::Increment { delta, .. } => {
                if !field.kind.is_numeric() {
                    return Err(QueryError::invalid(format!(
                        "cannot increment non-numeric field `{name}`"
                    )));
                }
                Ok((
                    format!("{col} = {col} + ?", col = field.column),
                    SqlValue::Integer(*delta),
                ))
            }
        }
    }
}

/// Column reference resolved from a descriptor path.
struct ColumnRef {
    sql: String,
    field: &'static FieldDef,
}

/// Path resolution context that records the to-one joins it needs.
struct Scope {
    root: &'static EntitySchema,
    qualified: bool,
    joins: Vec<&'static RelationDef>,
}

impl Scope {
    fn qualified(root: &'static EntitySchema) -> Self {
        Self {
            root,
            qualified: true,
            joins: Vec::new(),
        }
    }

    fn unqualified(root: &'static EntitySchema) -> Self {
        Self {
            root,
            qualified: false,
            joins: Vec::new(),
        }
    }

    fn join(&mut self, relation: &'static RelationDef) -> String {
        if !self.joins.iter().any(|joined| joined.name == relation.name) {
            self.joins.push(relation);
        }
        join_alias(self.root.alias, relation)
    }

    fn resolve(&mut self, path: &str, usage: &str) -> QueryResult<ColumnRef> {
        let parsed = parse_field_path(path)
            .ok_or_else(|| QueryError::invalid(format!("malformed field path `{path}` in {usage}")))?;

        let Some(relation_name) = parsed.relation else {
            let field = find_field(self.root, parsed.field)?;
            let sql = if self.qualified {
                format!("{}.{}", self.root.alias, field.column)
            } else {
                field.column.to_string()
            };
            return Ok(ColumnRef { sql, field });
        };

        let relation = self.root.relation(relation_name).ok_or_else(|| {
            QueryError::invalid(format!(
                "unknown relation `{relation_name}` on {}",
                self.root.name
            ))
        })?;
        if !self.qualified {
            return Err(QueryError::invalid(format!(
                "bulk mutations filter on root fields only, got `{path}`"
            )));
        }
        if relation.cardinality == Cardinality::ToMany {
            return Err(QueryError::invalid(format!(
                "`{path}` goes through to-many relation `{relation_name}`; only fetch hints may"
            )));
        }
        let field = find_field(relation.target, parsed.field)?;
        let alias = self.join(relation);
        Ok(ColumnRef {
            sql: format!("{alias}.{}", field.column),
            field,
        })
    }
}

fn find_field(schema: &'static EntitySchema, name: &str) -> QueryResult<&'static FieldDef> {
    schema
        .fields
        .iter()
        .find(|field| field.name == name)
        .ok_or_else(|| QueryError::invalid(format!("unknown field `{name}` on {}", schema.name)))
}

fn join_alias(root_alias: &str, relation: &RelationDef) -> String {
    format!("{root_alias}_{}", relation.name)
}

fn render_joins(root_alias: &str, joins: &[&'static RelationDef]) -> String {
    joins
        .iter()
        .map(|relation| {
            let alias = join_alias(root_alias, relation);
            format!(
                " LEFT JOIN {table} {alias} ON {alias}.{remote} = {root_alias}.{local}",
                table = relation.target.table,
                remote = relation.remote_column,
                local = relation.local_column
            )
        })
        .collect()
}

fn push_entity_columns(
    columns: &mut Vec<String>,
    alias: &str,
    schema: &EntitySchema,
    prefix: Option<&str>,
) {
    for field in schema.fields {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", field.name),
            None => field.name.to_string(),
        };
        columns.push(format!("{alias}.{} AS \"{path}\"", field.column));
    }
}

/// Renders ` WHERE a AND b` (or an empty string) plus its bindings.
fn render_where(scope: &mut Scope, predicates: &[Predicate]) -> QueryResult<(String, Vec<SqlValue>)> {
    let mut terms = Vec::with_capacity(predicates.len());
    let mut params = Vec::new();
    for predicate in predicates {
        terms.push(render_predicate(scope, predicate, &mut params)?);
    }
    if terms.is_empty() {
        return Ok((String::new(), params));
    }
    Ok((format!(" WHERE {}", terms.join(" AND ")), params))
}

fn render_predicate(
    scope: &mut Scope,
    predicate: &Predicate,
    params: &mut Vec<SqlValue>,
) -> QueryResult<String> {
    let path = predicate.field.as_str();
    let column = scope.resolve(path, "filter")?;
    let op = predicate.op;

    match op {
        Operator::IsNull | Operator::IsNotNull => {
            if !predicate.value.is_null() {
                return Err(QueryError::invalid(format!(
                    "`{}` on `{path}` takes no value",
                    op.sql()
                )));
            }
            Ok(format!("{} {}", column.sql, op.sql()))
        }
        Operator::In => {
            let Value::List(items) = &predicate.value else {
                return Err(QueryError::invalid(format!("`IN` on `{path}` needs a list value")));
            };
            if items.is_empty() {
                return Ok("0 = 1".to_string());
            }
            for item in items {
                params.push(check_scalar(column.field, path, item)?);
            }
            let placeholders = vec!["?"; items.len()].join(", ");
            Ok(format!("{} IN ({placeholders})", column.sql))
        }
        Operator::Like | Operator::Glob => {
            if !column.field.kind.is_textual() || predicate.value.as_text().is_none() {
                return Err(QueryError::invalid(format!(
                    "`{}` needs a text field and text value, got `{path}`",
                    op.sql()
                )));
            }
            params.push(check_scalar(column.field, path, &predicate.value)?);
            if op == Operator::Like {
                Ok(format!("{} LIKE ? ESCAPE '\\'", column.sql))
            } else {
                Ok(format!("{} GLOB ?", column.sql))
            }
        }
        Operator::Eq | Operator::Ne | Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
            params.push(check_scalar(column.field, path, &predicate.value)?);
            Ok(format!("{} {} ?", column.sql, op.sql()))
        }
    }
}

/// Checks a comparison value against the field kind and converts it.
fn check_scalar(field: &FieldDef, path: &str, value: &Value) -> QueryResult<SqlValue> {
    let matches_kind = match value {
        Value::Integer(_) => field.kind.is_numeric(),
        Value::Text(_) => field.kind.is_textual(),
        Value::Null => {
            return Err(QueryError::invalid(format!(
                "null comparison on `{path}`; use is_null/is_not_null"
            )))
        }
        Value::List(_) => false,
    };
    if !matches_kind {
        return Err(QueryError::invalid(format!(
            "value {value:?} does not fit field `{path}` of kind {:?}",
            field.kind
        )));
    }
    bindable(path, value)
}

fn bindable(path: &str, value: &Value) -> QueryResult<SqlValue> {
    value
        .to_sql()
        .ok_or_else(|| QueryError::invalid(format!("list value cannot be bound to `{path}`")))
}

fn resolve_window(page: Option<Pagination>) -> QueryResult<Option<PageWindow>> {
    let Some(page) = page else {
        return Ok(None);
    };
    let window = match page {
        Pagination::Page { index, size } => {
            if size == 0 {
                return Err(QueryError::invalid("page size must be greater than zero"));
            }
            let offset = index
                .checked_mul(size)
                .ok_or_else(|| QueryError::invalid("page window overflows"))?;
            PageWindow {
                index,
                size,
                offset,
            }
        }
        Pagination::Offset { offset, limit } => {
            if limit == 0 {
                return Err(QueryError::invalid("limit must be greater than zero"));
            }
            PageWindow {
                index: offset / limit,
                size: limit,
                offset,
            }
        }
    };
    Ok(Some(window))
}

fn to_bind_int(value: u64) -> QueryResult<i64> {
    i64::try_from(value).map_err(|_| QueryError::invalid(format!("window value {value} is too large")))
}
