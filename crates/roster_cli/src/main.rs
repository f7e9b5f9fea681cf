//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `roster_core` linkage end to end on an in-memory store.
//! - Keep output deterministic apart from generated ids.

use roster_core::{
    open_db_in_memory, run_roster, MemberRepository, PageRequest, RepoError, SortOrder,
    StoreConfig, TimestampAuditor,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("roster_core ping={}", roster_core::ping());
    println!("roster_core version={}", roster_core::core_version());

    let mut conn = open_db_in_memory()?;
    let config = StoreConfig::default();

    let page = run_roster(&mut conn, &config, TimestampAuditor::default(), |roster| {
        let team = roster.register_team("teamA")?;
        for (index, name) in ["member1", "member2", "member3", "member4", "member5"]
            .iter()
            .enumerate()
        {
            let team_id = (index % 2 == 0).then_some(team.id);
            roster.register_member(name, 10, team_id)?;
        }
        let bumped = roster.bump_ages_from(10)?;
        println!("bulk_age_plus affected={bumped}");
        let request = PageRequest::of(0, 3).sorted(SortOrder::desc("username"));
        let page = roster.members_by_age_page(11, &request)?;
        println!("members total={}", roster.members().count()?);
        Ok::<_, RepoError>(page)
    })?;

    println!(
        "page index={} size={} total_elements={} total_pages={} has_next={}",
        page.page_index,
        page.page_size,
        page.total_elements,
        page.total_pages(),
        page.has_next
    );
    for member in &page.content {
        println!("member username={} age={}", member.username, member.age);
    }
    Ok(())
}
