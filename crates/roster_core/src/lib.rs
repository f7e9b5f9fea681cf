//! Member/team roster core.
//!
//! Declarative query descriptors are translated into parameterized SQLite
//! statements and executed inside caller-scoped transactions, with paging,
//! counting, bulk mutation, pessimistic locking and audit timestamps.

pub mod config;
pub mod db;
pub mod execution;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod schema;
pub mod service;

pub use config::{ConfigError, LogConfig, RosterConfig, StoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with, run_in_transaction, DbError, DbResult};
pub use execution::audit::{AuditInterceptor, Clock, ManualClock, SystemClock, TimestampAuditor};
pub use execution::entity::Entity;
pub use execution::Executor;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::dto::{MemberDto, MemberProjection, UsernameOnly};
pub use model::member::{Member, MemberId, MemberProbe, TeamRef};
pub use model::team::{Team, TeamId};
pub use model::ValidationError;
pub use query::{
    Direction, Example, ExampleMatcher, LockMode, MutationDescriptor, Operator, PageRequest,
    Projection, QueryDescriptor, QueryError, QueryResult, Record, ResultPage, SortOrder,
    Specification, StringMatcher, Translator, Value,
};
pub use repo::{
    MemberRepository, MemberRepositoryCustom, MemberSpecs, RepoError, RepoResult,
    SqliteMemberRepository, SqliteTeamRepository, TeamRepository,
};
pub use schema::MEMBER_ALL_GRAPH;
pub use service::{run_roster, RosterService, Transfer};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
