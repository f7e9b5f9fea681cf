//! Member repository contracts and executor-backed implementation.

use crate::execution::Executor;
use crate::model::dto::{MemberDto, MemberProjection};
use crate::model::member::{Member, MemberId, MemberProbe};
use crate::query::{
    Example, LockMode, MutationDescriptor, Operator, PageRequest, Projection, QueryDescriptor,
    ResultPage, Specification, Translator,
};
use crate::repo::member_repo_custom::MemberRepositoryCustom;
use crate::repo::{RepoError, RepoResult};
use crate::schema::{MEMBER_ALL_GRAPH, MEMBER_SCHEMA};

/// Member data access used by services and callers.
pub trait MemberRepository: MemberRepositoryCustom {
    fn save(&self, member: &mut Member) -> RepoResult<MemberId>;
    fn update(&self, member: &mut Member) -> RepoResult<()>;
    fn delete(&self, id: MemberId) -> RepoResult<()>;
    fn find_by_id(&self, id: MemberId) -> RepoResult<Option<Member>>;
    /// Every member with its team loaded.
    fn find_all(&self) -> RepoResult<Vec<Member>>;
    fn count(&self) -> RepoResult<u64>;

    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i64,
    ) -> RepoResult<Vec<Member>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    /// Exactly one member: `NotFound` when missing, `NonUniqueResult` when
    /// ambiguous.
    fn find_member_by_username(&self, username: &str) -> RepoResult<Member>;
    fn find_user(&self, username: &str, age: i64) -> RepoResult<Vec<Member>>;
    fn find_username_list(&self) -> RepoResult<Vec<String>>;
    /// Members that belong to a team, flattened with the team name.
    fn find_member_dto(&self) -> RepoResult<Vec<MemberDto>>;
    /// Members with `username`, shaped as the read model `P`.
    fn find_projections_by_username<P: Projection>(&self, username: &str) -> RepoResult<Vec<P>>
    where
        Self: Sized;
    /// One page of every member as a [`MemberProjection`], counted like an
    /// entity page.
    fn find_projection_page(
        &self,
        request: &PageRequest,
    ) -> RepoResult<ResultPage<MemberProjection>>;
    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Member>>;
    /// Fails with `NonUniqueResult` when the username is ambiguous.
    fn find_optional_by_username(&self, username: &str) -> RepoResult<Option<Member>>;
    fn find_by_age(&self, age: i64, request: &PageRequest) -> RepoResult<ResultPage<Member>>;
    /// Adds one year to every member aged `age` or older.
    fn bulk_age_plus(&self, age: i64) -> RepoResult<usize>;
    /// Members that have a team, with the team loaded.
    fn find_member_fetch_join(&self) -> RepoResult<Vec<Member>>;
    /// Every member with its team loaded through an ad hoc fetch.
    fn find_member_entity_graph(&self) -> RepoResult<Vec<Member>>;
    fn find_entity_graph_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    /// Same rows as [`Self::find_entity_graph_by_username`], loaded through
    /// the `Member.all` named graph.
    fn find_named_entity_graph_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    /// Read that bypasses the identity cache.
    fn find_read_only_by_username(&self, username: &str) -> RepoResult<Option<Member>>;
    /// Read that holds the store write lock until the transaction ends.
    fn find_lock_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    fn find_matching(&self, specification: &Specification) -> RepoResult<Vec<Member>>;
    fn find_by_example(&self, example: &Example<MemberProbe>) -> RepoResult<Vec<Member>>;
    /// Runs an arbitrary descriptor, e.g. one decoded from JSON.
    fn find_page(&self, descriptor: &QueryDescriptor) -> RepoResult<ResultPage<Member>>;

    fn find_list_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.find_by_username(username)
    }
}

/// Reusable member filters.
pub struct MemberSpecs;

impl MemberSpecs {
    pub fn username(username: impl Into<String>) -> Specification {
        Specification::matching("username", Operator::Eq, username.into())
    }

    /// A blank name leaves the team unconstrained.
    pub fn team_name(name: &str) -> Specification {
        if name.trim().is_empty() {
            return Specification::all();
        }
        Specification::matching("team.name", Operator::Eq, name)
    }

    pub fn older_than(age: i64) -> Specification {
        Specification::matching("age", Operator::Gt, age)
    }
}

/// Member repository running on a transaction-scoped executor.
pub struct SqliteMemberRepository<'e> {
    exec: &'e Executor<'e>,
}

impl<'e> SqliteMemberRepository<'e> {
    pub fn new(exec: &'e Executor<'e>) -> Self {
        Self { exec }
    }

    pub(crate) fn executor(&self) -> &'e Executor<'e> {
        self.exec
    }

    fn list(&self, descriptor: &QueryDescriptor) -> RepoResult<Vec<Member>> {
        let plan = self.exec.compile::<Member>(descriptor)?;
        Ok(self.exec.run_list(&plan)?)
    }

    fn single(&self, descriptor: &QueryDescriptor) -> RepoResult<Option<Member>> {
        let plan = self.exec.compile::<Member>(descriptor)?;
        Ok(self.exec.run_single(&plan)?)
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn save(&self, member: &mut Member) -> RepoResult<MemberId> {
        member.validate()?;
        self.exec.persist(member)?;
        Ok(member.id)
    }

    fn update(&self, member: &mut Member) -> RepoResult<()> {
        member.validate()?;
        if self.exec.merge(member)? == 0 {
            return Err(RepoError::not_found(MEMBER_SCHEMA.name, member.id));
        }
        Ok(())
    }

    fn delete(&self, id: MemberId) -> RepoResult<()> {
        if self.exec.remove::<Member>(&id.to_string())? == 0 {
            return Err(RepoError::not_found(MEMBER_SCHEMA.name, id));
        }
        Ok(())
    }

    fn find_by_id(&self, id: MemberId) -> RepoResult<Option<Member>> {
        Ok(self.exec.find_by_key(&id.to_string())?)
    }

    fn find_all(&self) -> RepoResult<Vec<Member>> {
        self.list(&QueryDescriptor::new().fetch("team"))
    }

    fn count(&self) -> RepoResult<u64> {
        let plan = self.exec.compile::<Member>(&QueryDescriptor::new())?;
        Ok(self.exec.run_count(&plan)?)
    }

    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i64,
    ) -> RepoResult<Vec<Member>> {
        self.list(
            &QueryDescriptor::new()
                .eq("username", username)
                .filter("age", Operator::Gt, age),
        )
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.list(&QueryDescriptor::new().eq("username", username))
    }

    fn find_member_by_username(&self, username: &str) -> RepoResult<Member> {
        self.single(&QueryDescriptor::new().eq("username", username))?
            .ok_or_else(|| RepoError::not_found(MEMBER_SCHEMA.name, username))
    }

    fn find_user(&self, username: &str, age: i64) -> RepoResult<Vec<Member>> {
        self.list(&QueryDescriptor::new().eq("username", username).eq("age", age))
    }

    fn find_username_list(&self) -> RepoResult<Vec<String>> {
        let plan = self
            .exec
            .compile::<Member>(&QueryDescriptor::new().select(["username"]))?;
        let rows = self.exec.run_projection(&plan)?;
        rows.iter()
            .map(|row| row.text("username").map_err(RepoError::from))
            .collect()
    }

    fn find_member_dto(&self) -> RepoResult<Vec<MemberDto>> {
        let descriptor = QueryDescriptor::new()
            .is_not_null("team.id")
            .select(MemberDto::paths().iter().copied());
        let plan = self.exec.compile::<Member>(&descriptor)?;
        Ok(self.exec.run_projection_as(&plan)?)
    }

    fn find_projections_by_username<P: Projection>(&self, username: &str) -> RepoResult<Vec<P>> {
        let descriptor = QueryDescriptor::new()
            .eq("username", username)
            .select(P::paths().iter().copied());
        let plan = Translator::new(P::schema()).compile_query(&descriptor)?;
        Ok(self.exec.run_projection_as(&plan)?)
    }

    fn find_projection_page(
        &self,
        request: &PageRequest,
    ) -> RepoResult<ResultPage<MemberProjection>> {
        let descriptor = QueryDescriptor::new()
            .select(MemberProjection::paths().iter().copied())
            .paged(request);
        let plan = self.exec.compile::<Member>(&descriptor)?;
        let page = self.exec.run_projection_page(&plan)?;
        page.try_map(|row| MemberProjection::from_record(&row))
            .map_err(RepoError::from)
    }

    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Member>> {
        self.list(&QueryDescriptor::new().filter("username", Operator::In, names.to_vec()))
    }

    fn find_optional_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        self.single(&QueryDescriptor::new().eq("username", username))
    }

    fn find_by_age(&self, age: i64, request: &PageRequest) -> RepoResult<ResultPage<Member>> {
        self.find_page(&QueryDescriptor::new().eq("age", age).paged(request))
    }

    fn bulk_age_plus(&self, age: i64) -> RepoResult<usize> {
        let descriptor = MutationDescriptor::update()
            .increment("age", 1)
            .filter("age", Operator::Ge, age);
        let plan = Translator::new(&MEMBER_SCHEMA).compile_mutation(&descriptor)?;
        Ok(self.exec.run_mutation(&plan)?)
    }

    fn find_member_fetch_join(&self) -> RepoResult<Vec<Member>> {
        self.list(&QueryDescriptor::new().is_not_null("team.id").fetch("team"))
    }

    fn find_member_entity_graph(&self) -> RepoResult<Vec<Member>> {
        self.list(&QueryDescriptor::new().fetch("team"))
    }

    fn find_entity_graph_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.list(&QueryDescriptor::new().eq("username", username).fetch("team"))
    }

    fn find_named_entity_graph_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.list(
            &QueryDescriptor::new()
                .eq("username", username)
                .graph(MEMBER_ALL_GRAPH),
        )
    }

    fn find_read_only_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        self.single(&QueryDescriptor::new().eq("username", username).read_only())
    }

    fn find_lock_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.list(
            &QueryDescriptor::new()
                .eq("username", username)
                .lock(LockMode::PessimisticWrite),
        )
    }

    fn find_matching(&self, specification: &Specification) -> RepoResult<Vec<Member>> {
        self.list(&specification.clone().into_descriptor())
    }

    fn find_by_example(&self, example: &Example<MemberProbe>) -> RepoResult<Vec<Member>> {
        self.list(&example.to_descriptor())
    }

    fn find_page(&self, descriptor: &QueryDescriptor) -> RepoResult<ResultPage<Member>> {
        let plan = self.exec.compile::<Member>(descriptor)?;
        Ok(self.exec.run_query(&plan)?)
    }
}

#[cfg(test)]
mod tests {
    use super::MemberSpecs;

    #[test]
    fn blank_team_name_spec_matches_everything() {
        assert!(MemberSpecs::team_name(" ").predicates().is_empty());
        let combined = MemberSpecs::username("m1").and(MemberSpecs::team_name("teamA"));
        assert_eq!(combined.predicates().len(), 2);
    }
}
