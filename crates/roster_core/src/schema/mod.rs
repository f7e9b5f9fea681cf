//! Static entity schema model.
//!
//! # Responsibility
//! - Describe stored record kinds (tables, fields, relations) for the
//!   translator to resolve descriptor paths against.
//! - Validate field path syntax before lookup.
//!
//! # Invariants
//! - Every schema lists its key field first in `fields`.
//! - A path is either `field` or `relation.field`; deeper paths do not exist.

mod entities;

pub use entities::{MEMBER_ALL_GRAPH, MEMBER_SCHEMA, TEAM_SCHEMA};

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static FIELD_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z][a-z0-9_]*)(?:\.([a-z][a-z0-9_]*))?$").expect("valid field path regex")
});

/// Storage kind of one field; drives value checks in the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Primary key, stored as text.
    Key,
    Text,
    Integer,
    /// Epoch milliseconds.
    Timestamp,
    /// Foreign key column, stored as text.
    Reference,
}

impl FieldKind {
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Key | Self::Text | Self::Reference)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Timestamp)
    }
}

#[derive(Debug)]
pub struct FieldDef {
    /// Name used in descriptor paths.
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// Join edge from one schema to another.
///
/// The join condition is `source.local_column = target.remote_column`.
pub struct RelationDef {
    pub name: &'static str,
    pub target: &'static EntitySchema,
    pub cardinality: Cardinality,
    pub local_column: &'static str,
    pub remote_column: &'static str,
}

impl fmt::Debug for RelationDef {
    // Schemas point at each other; print the target by name only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDef")
            .field("name", &self.name)
            .field("target", &self.target.name)
            .field("cardinality", &self.cardinality)
            .field("local_column", &self.local_column)
            .field("remote_column", &self.remote_column)
            .finish()
    }
}

/// Named set of relations loaded together, selectable by name from a
/// descriptor.
#[derive(Debug)]
pub struct EntityGraph {
    pub name: &'static str,
    pub fetch: &'static [&'static str],
}

#[derive(Debug)]
pub struct EntitySchema {
    pub name: &'static str,
    pub table: &'static str,
    /// Short SQL alias for the table when it is the query root.
    pub alias: &'static str,
    pub fields: &'static [FieldDef],
    pub relations: &'static [RelationDef],
    pub graphs: &'static [EntityGraph],
}

impl EntitySchema {
    pub fn key_field(&self) -> &FieldDef {
        &self.fields[0]
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    pub fn graph(&self, name: &str) -> Option<&EntityGraph> {
        self.graphs.iter().find(|graph| graph.name == name)
    }

    /// Fields the audit interceptor owns.
    pub fn has_audit_columns(&self) -> bool {
        self.field("created_at").is_some() && self.field("updated_at").is_some()
    }
}

/// Parsed `field` or `relation.field` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath<'p> {
    pub relation: Option<&'p str>,
    pub field: &'p str,
}

/// Splits a descriptor path; `None` when the syntax is invalid.
pub fn parse_field_path(path: &str) -> Option<FieldPath<'_>> {
    let caps = FIELD_PATH_RE.captures(path)?;
    let first = caps.get(1)?.as_str();
    match caps.get(2) {
        Some(second) => Some(FieldPath {
            relation: Some(first),
            field: second.as_str(),
        }),
        None => Some(FieldPath {
            relation: None,
            field: first,
        }),
    }
}
