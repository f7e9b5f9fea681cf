//! Repository contracts and executor-backed implementations.
//!
//! # Responsibility
//! - Expose use-case shaped reads and writes for members and teams.
//! - Express every query as a descriptor; SQL stays in the translator.
//!
//! # Invariants
//! - Write paths call `validate()` before touching the store.
//! - Single-row updates/deletes of a missing key are `NotFound`; singular
//!   reads of a missing key are `Ok(None)`, except
//!   `find_member_by_username`, which is `NotFound`.

pub mod member_repo;
pub mod member_repo_custom;
pub mod team_repo;

use crate::db::DbError;
use crate::model::ValidationError;
use crate::query::QueryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use member_repo::{MemberRepository, MemberSpecs, SqliteMemberRepository};
pub use member_repo_custom::MemberRepositoryCustom;
pub use team_repo::{SqliteTeamRepository, TeamRepository};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Query(QueryError),
    NotFound { entity: &'static str, key: String },
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// The underlying query failure, if any.
    pub fn query_error(&self) -> Option<&QueryError> {
        match self {
            Self::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::NotFound { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Query(QueryError::from(value))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Query(QueryError::from(value))
    }
}
