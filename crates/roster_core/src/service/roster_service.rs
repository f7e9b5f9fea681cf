//! Roster use cases: teams, member registration and transfers.

use crate::config::StoreConfig;
use crate::db::run_in_transaction;
use crate::execution::audit::TimestampAuditor;
use crate::execution::Executor;
use crate::model::member::{Member, MemberId};
use crate::model::team::{Team, TeamId};
use crate::query::{PageRequest, ResultPage};
use crate::repo::{
    MemberRepository, RepoError, RepoResult, SqliteMemberRepository, SqliteTeamRepository,
    TeamRepository,
};
use crate::schema::{MEMBER_SCHEMA, TEAM_SCHEMA};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

/// Result of [`RosterService::transfer_member`]; both team values reflect
/// the move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub member: Member,
    /// The team left, loaded with its remaining members. `None` when the
    /// member had no team or already belonged to the target.
    pub from: Option<Team>,
    pub to: Team,
}

/// Use-case service over member and team repositories.
pub struct RosterService<M: MemberRepository, T: TeamRepository> {
    members: M,
    teams: T,
}

impl<M: MemberRepository, T: TeamRepository> RosterService<M, T> {
    pub fn new(members: M, teams: T) -> Self {
        Self { members, teams }
    }

    pub fn members(&self) -> &M {
        &self.members
    }

    pub fn teams(&self) -> &T {
        &self.teams
    }

    pub fn register_team(&self, name: &str) -> RepoResult<Team> {
        let mut team = Team::new(name);
        self.teams.save(&mut team)?;
        info!("event=team_register module=service status=ok team_id={}", team.id);
        Ok(team)
    }

    /// Creates a member, optionally in an existing team.
    ///
    /// # Errors
    /// - `NotFound` when `team_id` names no stored team.
    /// - `Validation` for a blank username or negative age.
    pub fn register_member(
        &self,
        username: &str,
        age: i64,
        team_id: Option<TeamId>,
    ) -> RepoResult<Member> {
        let mut member = match team_id {
            Some(team_id) => {
                let mut team = self.require_team(team_id)?;
                Member::in_team(username, age, &mut team)
            }
            None => Member::new(username, age),
        };
        self.members.save(&mut member)?;
        info!(
            "event=member_register module=service status=ok member_id={} has_team={}",
            member.id,
            team_id.is_some()
        );
        Ok(member)
    }

    /// Moves a stored member to another stored team.
    pub fn transfer_member(&self, member_id: MemberId, team_id: TeamId) -> RepoResult<Transfer> {
        let mut member = self
            .members
            .find_by_id(member_id)?
            .ok_or_else(|| RepoError::not_found(MEMBER_SCHEMA.name, member_id))?;
        let mut to = self.require_team(team_id)?;
        let mut from = match member.team_id() {
            Some(current) if current != team_id => self.teams.find_with_members(current)?,
            _ => None,
        };
        let previous = member.change_team(&mut to, from.as_mut());
        self.members.update(&mut member)?;
        info!(
            "event=member_transfer module=service status=ok member_id={} moved={}",
            member.id,
            previous != Some(team_id)
        );
        Ok(Transfer { member, from, to })
    }

    pub fn members_by_age_page(
        &self,
        age: i64,
        request: &PageRequest,
    ) -> RepoResult<ResultPage<Member>> {
        self.members.find_by_age(age, request)
    }

    /// Ages every member aged `age` or older by one year.
    pub fn bump_ages_from(&self, age: i64) -> RepoResult<usize> {
        let affected = self.members.bulk_age_plus(age)?;
        info!("event=member_bulk_age module=service status=ok affected={affected}");
        Ok(affected)
    }

    /// Team with its member set loaded.
    pub fn team_roster(&self, team_id: TeamId) -> RepoResult<Option<Team>> {
        self.teams.find_with_members(team_id)
    }

    fn require_team(&self, team_id: TeamId) -> RepoResult<Team> {
        self.teams
            .find_with_members(team_id)?
            .ok_or_else(|| RepoError::not_found(TEAM_SCHEMA.name, team_id))
    }
}

/// Runs `work` against a roster service bound to one immediate transaction.
///
/// Commits when `work` returns `Ok`, rolls back otherwise.
pub fn run_roster<R, F>(
    conn: &mut Connection,
    config: &StoreConfig,
    auditor: TimestampAuditor,
    work: F,
) -> RepoResult<R>
where
    F: for<'e> FnOnce(
        &RosterService<SqliteMemberRepository<'e>, SqliteTeamRepository<'e>>,
    ) -> RepoResult<R>,
{
    run_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        let exec = Executor::new(tx, config).with_auditor(auditor);
        let service = RosterService::new(
            SqliteMemberRepository::new(&exec),
            SqliteTeamRepository::new(&exec),
        );
        work(&service)
    })
}
