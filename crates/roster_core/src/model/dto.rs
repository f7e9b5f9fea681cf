//! Flat read models built from projections.

use crate::model::member::MemberId;
use crate::query::{Projection, QueryResult, Record};
use crate::schema::{EntitySchema, MEMBER_SCHEMA};
use serde::{Deserialize, Serialize};

/// Member joined with its team name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: MemberId,
    pub username: String,
    pub team_name: String,
}

impl Projection for MemberDto {
    fn schema() -> &'static EntitySchema {
        &MEMBER_SCHEMA
    }

    fn paths() -> &'static [&'static str] {
        &["id", "username", "team.name"]
    }

    fn from_record(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            id: record.uuid("id")?,
            username: record.text("username")?,
            team_name: record.text("team.name")?,
        })
    }
}

/// Just the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameOnly {
    pub username: String,
}

impl Projection for UsernameOnly {
    fn schema() -> &'static EntitySchema {
        &MEMBER_SCHEMA
    }

    fn paths() -> &'static [&'static str] {
        &["username"]
    }

    fn from_record(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            username: record.text("username")?,
        })
    }
}

/// Member with its team name; `team_name` is `None` for members without a
/// team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProjection {
    pub id: MemberId,
    pub username: String,
    pub team_name: Option<String>,
}

impl Projection for MemberProjection {
    fn schema() -> &'static EntitySchema {
        &MEMBER_SCHEMA
    }

    fn paths() -> &'static [&'static str] {
        &["id", "username", "team.name"]
    }

    fn from_record(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            id: record.uuid("id")?,
            username: record.text("username")?,
            team_name: record.opt_text("team.name")?,
        })
    }
}
