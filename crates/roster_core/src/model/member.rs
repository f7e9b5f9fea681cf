//! Member record and its query-by-example probe.

use crate::execution::entity::Entity;
use crate::model::audit::AuditStamp;
use crate::model::team::{Team, TeamId};
use crate::model::ValidationError;
use crate::query::{Probe, QueryResult, Record, Value};
use crate::schema::{EntitySchema, MEMBER_SCHEMA};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MemberId = Uuid;

/// Link from a member to its team.
///
/// The team value is only present when the row was read with the `team`
/// fetch hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: TeamId,
    loaded: Option<Team>,
}

impl TeamRef {
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn team(&self) -> Option<&Team> {
        self.loaded.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub username: String,
    pub age: i64,
    team: Option<TeamRef>,
    audit: AuditStamp,
}

impl Member {
    pub fn new(username: impl Into<String>, age: i64) -> Self {
        Self::with_id(Uuid::new_v4(), username, age)
    }

    pub fn with_id(id: MemberId, username: impl Into<String>, age: i64) -> Self {
        Self {
            id,
            username: username.into(),
            age,
            team: None,
            audit: AuditStamp::default(),
        }
    }

    /// Creates a member already linked to `team` on both sides.
    pub fn in_team(username: impl Into<String>, age: i64, team: &mut Team) -> Self {
        let mut member = Self::new(username, age);
        member.change_team(team, None);
        member
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.age < 0 {
            return Err(ValidationError::NegativeAge(self.age));
        }
        Ok(())
    }

    pub fn team_id(&self) -> Option<TeamId> {
        self.team.as_ref().map(|link| link.id)
    }

    /// Team value, when it was fetched together with this member.
    pub fn team(&self) -> Option<&Team> {
        self.team.as_ref().and_then(TeamRef::team)
    }

    pub fn team_ref(&self) -> Option<&TeamRef> {
        self.team.as_ref()
    }

    pub fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    /// Moves this member to `team`, registering it in the team's member set.
    ///
    /// `previous` is the in-memory value of the team being left, if the
    /// caller holds one; the member is removed from its set when it is the
    /// current team. Returns the previous team id.
    pub fn change_team(
        &mut self,
        team: &mut Team,
        previous: Option<&mut Team>,
    ) -> Option<TeamId> {
        let previous_id = self.team_id();
        if let Some(previous) = previous {
            if previous_id == Some(previous.id) && previous.id != team.id {
                previous.detach(self.id);
            }
        }
        team.attach(self.id);
        let loaded = self
            .team
            .take()
            .and_then(|link| link.loaded)
            .filter(|current| current.id == team.id);
        self.team = Some(TeamRef {
            id: team.id,
            loaded,
        });
        previous_id
    }

    /// Clears the link; `team` loses this member if it is the current team.
    pub fn leave_team(&mut self, team: &mut Team) -> bool {
        if self.team_id() != Some(team.id) {
            return false;
        }
        team.detach(self.id);
        self.team = None;
        true
    }
}

impl Entity for Member {
    fn schema() -> &'static EntitySchema {
        &MEMBER_SCHEMA
    }

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn from_record(record: &Record) -> QueryResult<Self> {
        let team_id = record.opt_uuid("team_id")?;
        let loaded = if record.contains("team.id") && record.opt_uuid("team.id")?.is_some() {
            Some(Team::from_prefixed(record, Some("team"))?)
        } else {
            None
        };
        Ok(Self {
            id: record.uuid("id")?,
            username: record.text("username")?,
            age: record.integer("age")?,
            team: team_id.map(|id| TeamRef { id, loaded }),
            audit: AuditStamp {
                created_at: record.integer("created_at")?,
                updated_at: record.integer("updated_at")?,
            },
        })
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::from(self.id)),
            ("username", Value::from(self.username.as_str())),
            ("age", Value::from(self.age)),
            ("team_id", Value::from(self.team_id())),
            ("created_at", Value::from(self.audit.created_at)),
            ("updated_at", Value::from(self.audit.updated_at)),
        ]
    }

    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

/// Query-by-example template for members. `None` leaves a field
/// unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberProbe {
    pub username: Option<String>,
    pub age: Option<i64>,
    pub team_name: Option<String>,
}

impl MemberProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn team_name(mut self, name: impl Into<String>) -> Self {
        self.team_name = Some(name.into());
        self
    }
}

impl From<&Member> for MemberProbe {
    fn from(member: &Member) -> Self {
        Self {
            username: Some(member.username.clone()),
            age: Some(member.age),
            team_name: member.team().map(|team| team.name.clone()),
        }
    }
}

impl Probe for MemberProbe {
    fn schema() -> &'static EntitySchema {
        &MEMBER_SCHEMA
    }

    fn probe_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("username", Value::from(self.username.clone())),
            ("age", Value::from(self.age)),
            ("team.name", Value::from(self.team_name.clone())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{Member, MemberProbe};
    use crate::execution::entity::Entity;
    use crate::model::team::Team;
    use crate::model::ValidationError;
    use crate::query::{Example, Record, Value};

    #[test]
    fn change_team_links_both_sides() {
        let mut team_a = Team::new("teamA");
        let mut team_b = Team::new("teamB");
        let mut member = Member::in_team("member1", 10, &mut team_a);
        assert!(team_a.has_member(member.id));

        let previous = member.change_team(&mut team_b, Some(&mut team_a));
        assert_eq!(previous, Some(team_a.id));
        assert_eq!(member.team_id(), Some(team_b.id));
        assert!(team_b.has_member(member.id));
        assert!(!team_a.has_member(member.id));
    }

    #[test]
    fn change_team_ignores_unrelated_previous_value() {
        let mut team_a = Team::new("teamA");
        let mut team_b = Team::new("teamB");
        let mut other = Team::new("other");
        let mut member = Member::in_team("member1", 10, &mut team_a);
        other.attach(member.id);

        member.change_team(&mut team_b, Some(&mut other));
        assert!(other.has_member(member.id));
        assert!(team_a.has_member(member.id));
    }

    #[test]
    fn leave_team_only_detaches_current_team() {
        let mut team_a = Team::new("teamA");
        let mut other = Team::new("other");
        let mut member = Member::in_team("member1", 10, &mut team_a);

        assert!(!member.leave_team(&mut other));
        assert!(member.leave_team(&mut team_a));
        assert!(member.team_id().is_none());
        assert!(team_a.members().is_empty());
    }

    #[test]
    fn validation_rejects_blank_name_and_negative_age() {
        assert_eq!(Member::new(" ", 1).validate(), Err(ValidationError::EmptyUsername));
        assert_eq!(Member::new("a", -1).validate(), Err(ValidationError::NegativeAge(-1)));
        assert!(Member::new("a", 0).validate().is_ok());
    }

    #[test]
    fn record_with_fetched_team_loads_team_value() {
        let mut team = Team::new("teamA");
        let member = Member::in_team("member1", 10, &mut team);

        let mut record = Record::new();
        for (path, value) in member.to_values() {
            record.insert(path, value);
        }
        record.insert("team.id", Value::from(team.id));
        record.insert("team.name", Value::from("teamA"));
        record.insert("team.created_at", Value::from(0));
        record.insert("team.updated_at", Value::from(0));

        let loaded = Member::from_record(&record).unwrap();
        assert_eq!(loaded.team().map(|team| team.name.as_str()), Some("teamA"));
        assert!(loaded.team_ref().unwrap().is_loaded());
    }

    #[test]
    fn probe_skips_unset_fields() {
        let descriptor = Example::of(MemberProbe::new().username("m1").team_name("teamA"))
            .to_descriptor();
        let fields: Vec<&str> = descriptor
            .predicates
            .iter()
            .map(|predicate| predicate.field.as_str())
            .collect();
        assert_eq!(fields, vec!["username", "team.name"]);
    }
}
