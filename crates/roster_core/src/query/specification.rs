//! Composable AND-only predicate sets.

use crate::query::descriptor::{Operator, Predicate, QueryDescriptor};
use crate::query::value::Value;

/// Reusable filter fragment; combine fragments with [`Specification::and`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specification {
    predicates: Vec<Predicate>,
}

impl Specification {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            predicates: vec![Predicate::new(field, op, value)],
        }
    }

    pub fn and(mut self, other: Specification) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn into_descriptor(self) -> QueryDescriptor {
        QueryDescriptor::new().and_all(self.predicates)
    }
}
