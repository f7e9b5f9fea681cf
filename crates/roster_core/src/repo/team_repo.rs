//! Team repository contracts and executor-backed implementation.

use crate::execution::Executor;
use crate::model::team::{Team, TeamId};
use crate::query::QueryDescriptor;
use crate::repo::{RepoError, RepoResult};
use crate::schema::TEAM_SCHEMA;

pub trait TeamRepository {
    fn save(&self, team: &mut Team) -> RepoResult<TeamId>;
    fn update(&self, team: &mut Team) -> RepoResult<()>;
    /// Fails with `ConstraintViolation` while members still reference the
    /// team.
    fn delete(&self, id: TeamId) -> RepoResult<()>;
    fn find_by_id(&self, id: TeamId) -> RepoResult<Option<Team>>;
    /// The team with its member set loaded.
    fn find_with_members(&self, id: TeamId) -> RepoResult<Option<Team>>;
    fn find_all(&self) -> RepoResult<Vec<Team>>;
    fn count(&self) -> RepoResult<u64>;
}

pub struct SqliteTeamRepository<'e> {
    exec: &'e Executor<'e>,
}

impl<'e> SqliteTeamRepository<'e> {
    pub fn new(exec: &'e Executor<'e>) -> Self {
        Self { exec }
    }
}

impl TeamRepository for SqliteTeamRepository<'_> {
    fn save(&self, team: &mut Team) -> RepoResult<TeamId> {
        team.validate()?;
        self.exec.persist(team)?;
        Ok(team.id)
    }

    fn update(&self, team: &mut Team) -> RepoResult<()> {
        team.validate()?;
        if self.exec.merge(team)? == 0 {
            return Err(RepoError::not_found(TEAM_SCHEMA.name, team.id));
        }
        Ok(())
    }

    fn delete(&self, id: TeamId) -> RepoResult<()> {
        if self.exec.remove::<Team>(&id.to_string())? == 0 {
            return Err(RepoError::not_found(TEAM_SCHEMA.name, id));
        }
        Ok(())
    }

    fn find_by_id(&self, id: TeamId) -> RepoResult<Option<Team>> {
        Ok(self.exec.find_by_key(&id.to_string())?)
    }

    fn find_with_members(&self, id: TeamId) -> RepoResult<Option<Team>> {
        let descriptor = QueryDescriptor::new().eq("id", id).fetch("members");
        let plan = self.exec.compile::<Team>(&descriptor)?;
        Ok(self.exec.run_single(&plan)?)
    }

    fn find_all(&self) -> RepoResult<Vec<Team>> {
        let plan = self.exec.compile::<Team>(&QueryDescriptor::new())?;
        Ok(self.exec.run_list(&plan)?)
    }

    fn count(&self) -> RepoResult<u64> {
        let plan = self.exec.compile::<Team>(&QueryDescriptor::new())?;
        Ok(self.exec.run_count(&plan)?)
    }
}
