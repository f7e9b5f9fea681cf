//! Team record.

use crate::execution::entity::Entity;
use crate::model::audit::AuditStamp;
use crate::model::member::MemberId;
use crate::model::ValidationError;
use crate::query::{QueryResult, Record, Value};
use crate::schema::{EntitySchema, TEAM_SCHEMA};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TeamId = Uuid;

/// A named group of members.
///
/// `members` is a back-reference set: it is filled by the `members` fetch
/// hint or by [`crate::model::member::Member::change_team`], and it never
/// owns member lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    members: Vec<MemberId>,
    audit: AuditStamp,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: Vec::new(),
            audit: AuditStamp::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyTeamName);
        }
        Ok(())
    }

    /// Member ids known to this in-memory value, in link/fetch order.
    pub fn members(&self) -> &[MemberId] {
        &self.members
    }

    pub fn has_member(&self, id: MemberId) -> bool {
        self.members.contains(&id)
    }

    pub fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    pub(crate) fn attach(&mut self, id: MemberId) {
        if !self.has_member(id) {
            self.members.push(id);
        }
    }

    pub(crate) fn detach(&mut self, id: MemberId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != id);
        self.members.len() != before
    }

    /// Reads team columns, optionally under a relation prefix (`team.name`).
    pub(crate) fn from_prefixed(record: &Record, prefix: Option<&str>) -> QueryResult<Self> {
        let path = |field: &str| match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        Ok(Self {
            id: record.uuid(&path("id"))?,
            name: record.text(&path("name"))?,
            members: Vec::new(),
            audit: AuditStamp {
                created_at: record.integer(&path("created_at"))?,
                updated_at: record.integer(&path("updated_at"))?,
            },
        })
    }
}

impl Entity for Team {
    fn schema() -> &'static EntitySchema {
        &TEAM_SCHEMA
    }

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn from_record(record: &Record) -> QueryResult<Self> {
        let mut team = Self::from_prefixed(record, None)?;
        if record.contains("members.id") {
            if let Some(member_id) = record.opt_uuid("members.id")? {
                team.attach(member_id);
            }
        }
        Ok(team)
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::from(self.id)),
            ("name", Value::from(self.name.as_str())),
            ("created_at", Value::from(self.audit.created_at)),
            ("updated_at", Value::from(self.audit.updated_at)),
        ]
    }

    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }

    fn absorb(&mut self, duplicate: Self) {
        for member in duplicate.members {
            self.attach(member);
        }
    }
}
