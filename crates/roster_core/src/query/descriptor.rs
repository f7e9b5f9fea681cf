//! Structured query and mutation descriptors.
//!
//! # Responsibility
//! - Carry filter/sort/pagination/fetch/lock intent as plain data.
//! - Offer builder methods so call sites read like the query they express.
//!
//! # Invariants
//! - Predicates combine with AND only.
//! - Descriptors are unchecked; the translator validates them against a
//!   schema.

use crate::query::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// SQL `LIKE` with `\` as the escape character; ASCII case-insensitive.
    Like,
    /// SQL `GLOB`: case-sensitive, `*`/`?` wildcards, `[..]` classes.
    Glob,
    In,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
            Self::Glob => "GLOB",
            Self::In => "IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    #[serde(default)]
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Zero-indexed page window, either by page number or raw offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pagination {
    Page { index: u64, size: u64 },
    Offset { offset: u64, limit: u64 },
}

/// Page number, size and ordering in one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub index: u64,
    pub size: u64,
    #[serde(default)]
    pub sort: Vec<SortOrder>,
}

impl PageRequest {
    pub fn of(index: u64, size: u64) -> Self {
        Self {
            index,
            size,
            sort: Vec::new(),
        }
    }

    pub fn sorted(mut self, order: SortOrder) -> Self {
        self.sort.push(order);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Hold the store write lock for the enclosing transaction.
    PessimisticWrite,
}

/// Read intent for one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDescriptor {
    pub predicates: Vec<Predicate>,
    pub sort: Vec<SortOrder>,
    pub page: Option<Pagination>,
    /// Relation names to load eagerly.
    pub fetch: Vec<String>,
    /// Named entity graph whose relations are loaded on top of `fetch`.
    pub graph: Option<String>,
    pub lock: Option<LockMode>,
    /// Results are not registered in the session identity cache.
    pub read_only: bool,
    /// Projection paths; empty selects the whole entity.
    pub select: Vec<String>,
}

impl QueryDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::new(field, op, value));
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, Operator::Eq, value)
    }

    pub fn is_not_null(self, field: impl Into<String>) -> Self {
        self.filter(field, Operator::IsNotNull, Value::Null)
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort.push(SortOrder {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn page(mut self, index: u64, size: u64) -> Self {
        self.page = Some(Pagination::Page { index, size });
        self
    }

    pub fn offset(mut self, offset: u64, limit: u64) -> Self {
        self.page = Some(Pagination::Offset { offset, limit });
        self
    }

    /// Applies a page request's window and ordering.
    pub fn paged(mut self, request: &PageRequest) -> Self {
        self.page = Some(Pagination::Page {
            index: request.index,
            size: request.size,
        });
        self.sort.extend(request.sort.iter().cloned());
        self
    }

    pub fn fetch(mut self, relation: impl Into<String>) -> Self {
        self.fetch.push(relation.into());
        self
    }

    pub fn graph(mut self, name: impl Into<String>) -> Self {
        self.graph = Some(name.into());
        self
    }

    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock = Some(mode);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn select<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Appends all predicates of `other` (logical AND).
    pub fn and_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }
}

/// One `SET` clause of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignment {
    Set { field: String, value: Value },
    Increment { field: String, delta: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationKind {
    Update { assignments: Vec<Assignment> },
    Delete,
}

/// Bulk update/delete over every row matching `predicates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationDescriptor {
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    pub kind: MutationKind,
}

impl MutationDescriptor {
    pub fn update() -> Self {
        Self {
            predicates: Vec::new(),
            kind: MutationKind::Update {
                assignments: Vec::new(),
            },
        }
    }

    pub fn delete() -> Self {
        Self {
            predicates: Vec::new(),
            kind: MutationKind::Delete,
        }
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assign(Assignment::Set {
            field: field.into(),
            value: value.into(),
        })
    }

    pub fn increment(self, field: impl Into<String>, delta: i64) -> Self {
        self.assign(Assignment::Increment {
            field: field.into(),
            delta,
        })
    }

    pub fn filter(mut self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::new(field, op, value));
        self
    }

    fn assign(mut self, assignment: Assignment) -> Self {
        if let MutationKind::Update { assignments } = &mut self.kind {
            assignments.push(assignment);
        }
        self
    }
}
