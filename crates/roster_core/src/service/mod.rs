//! Use-case services over the repositories.
//!
//! # Responsibility
//! - Compose repository calls into roster use cases.
//! - Own the transaction boundary for those use cases.
//!
//! # Invariants
//! - Services never issue SQL; repositories and the executor do.
//! - One service call runs inside exactly one transaction when entered via
//!   [`roster_service::run_roster`].

pub mod roster_service;

pub use roster_service::{run_roster, RosterService, Transfer};
