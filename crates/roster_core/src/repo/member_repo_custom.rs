//! Hand-written member queries that sit beside the descriptor-driven ones.

use crate::model::member::Member;
use crate::query::{QueryDescriptor, Translator};
use crate::repo::member_repo::SqliteMemberRepository;
use crate::repo::RepoResult;
use crate::schema::MEMBER_SCHEMA;

/// Member queries implemented directly against the executor.
pub trait MemberRepositoryCustom {
    /// Every member in insertion order, without relations.
    fn find_member_custom(&self) -> RepoResult<Vec<Member>>;
}

impl MemberRepositoryCustom for SqliteMemberRepository<'_> {
    fn find_member_custom(&self) -> RepoResult<Vec<Member>> {
        let plan = Translator::new(&MEMBER_SCHEMA).compile_query(&QueryDescriptor::new())?;
        Ok(self.executor().run_list(&plan)?)
    }
}
