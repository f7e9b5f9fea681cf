//! Domain records stored by the roster core.
//!
//! # Responsibility
//! - Define `Member`, `Team` and their read models.
//! - Keep the Member↔Team link consistent on both sides in memory.
//!
//! # Invariants
//! - A member assigned to a team appears in that team's in-memory member set
//!   when the link was made in-process.
//! - Audit timestamps are written by the executor's audit interceptor only.

pub mod audit;
pub mod dto;
pub mod member;
pub mod team;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures raised before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyUsername,
    NegativeAge(i64),
    EmptyTeamName,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username cannot be empty"),
            Self::NegativeAge(age) => write!(f, "age cannot be negative, got {age}"),
            Self::EmptyTeamName => write!(f, "team name cannot be empty"),
        }
    }
}

impl Error for ValidationError {}
