//! Query descriptors, translation and result shapes.
//!
//! # Responsibility
//! - Model declarative read/mutation intent as structured values.
//! - Compile intent into SQL plans against the static schema.
//! - Define result shapes (`ResultPage`, `Record`) and query errors.
//!
//! # Invariants
//! - Translation never touches the store.
//! - Plans carry positional bindings only.

pub mod descriptor;
pub mod error;
pub mod example;
pub mod page;
pub mod plan;
pub mod projection;
pub mod record;
pub mod specification;
pub mod translate;
pub mod value;

pub use descriptor::{
    Assignment, Direction, LockMode, MutationDescriptor, MutationKind, Operator, PageRequest,
    Pagination, Predicate, QueryDescriptor, SortOrder,
};
pub use error::{QueryError, QueryResult};
pub use example::{Example, ExampleMatcher, Probe, StringMatcher};
pub use page::ResultPage;
pub use plan::{MutationPlan, PageWindow, QueryPlan, Statement};
pub use projection::Projection;
pub use record::Record;
pub use specification::Specification;
pub use translate::Translator;
pub use value::Value;
