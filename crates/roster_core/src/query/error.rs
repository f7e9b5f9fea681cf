//! Errors for query translation and execution.
//!
//! # Invariants
//! - `InvalidDescriptor` is produced before any store round-trip.
//! - Store errors keep the store-reported detail; constraint failures are
//!   surfaced as `ConstraintViolation` carrying the store error.
//! - A singular lookup with zero rows is `Ok(None)`, never an error.

use crate::db::DbError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug)]
pub enum QueryError {
    /// Unknown field, relation or operator, or a value of the wrong kind.
    InvalidDescriptor(String),
    /// The store write lock was not granted within the lock timeout.
    LockUnavailable { timeout_ms: u64 },
    /// Store-reported uniqueness/foreign-key/not-null failure.
    ConstraintViolation(rusqlite::Error),
    /// A singular lookup matched more than one row.
    NonUniqueResult { count: usize },
    /// A stored row cannot be converted into the requested shape.
    InvalidData(String),
    Db(DbError),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDescriptor(message) => write!(f, "invalid query descriptor: {message}"),
            Self::LockUnavailable { timeout_ms } => {
                write!(f, "write lock not granted within {timeout_ms} ms")
            }
            Self::ConstraintViolation(err) => write!(f, "constraint violation: {err}"),
            Self::NonUniqueResult { count } => {
                write!(f, "expected at most one result, query returned {count}")
            }
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConstraintViolation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidDescriptor(_) => None,
            Self::LockUnavailable { .. } => None,
            Self::NonUniqueResult { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for QueryError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        if sqlite_code(&value) == Some(ErrorCode::ConstraintViolation) {
            return Self::ConstraintViolation(value);
        }
        Self::Db(DbError::Sqlite(value))
    }
}

impl QueryError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor(message.into())
    }

    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDescriptor(_) => "invalid_descriptor",
            Self::LockUnavailable { .. } => "lock_unavailable",
            Self::ConstraintViolation(_) => "constraint_violation",
            Self::NonUniqueResult { .. } => "non_unique_result",
            Self::InvalidData(_) => "invalid_data",
            Self::Db(_) => "db_error",
        }
    }
}

pub(crate) fn sqlite_code(err: &rusqlite::Error) -> Option<ErrorCode> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.code),
        _ => None,
    }
}

/// Whether the store refused a lock because another connection holds it.
pub(crate) fn is_lock_contention(err: &rusqlite::Error) -> bool {
    matches!(
        sqlite_code(err),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
