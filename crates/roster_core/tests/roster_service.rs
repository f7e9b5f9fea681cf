use roster_core::{
    open_db_in_memory, run_roster, ManualClock, MemberRepository, PageRequest, RepoError,
    SortOrder, StoreConfig, TeamRepository, TimestampAuditor,
};
use std::sync::Arc;
use uuid::Uuid;

fn auditor(clock: &ManualClock) -> TimestampAuditor {
    TimestampAuditor::new(Arc::new(clock.clone()))
}

#[test]
fn committed_units_of_work_are_visible_to_later_ones() {
    let mut conn = open_db_in_memory().unwrap();
    let config = StoreConfig::default();
    let clock = ManualClock::new(5_000);

    let team = run_roster(&mut conn, &config, auditor(&clock), |roster| {
        let team = roster.register_team("teamA")?;
        roster.register_member("member1", 10, Some(team.id))?;
        roster.register_member("member2", 20, None)?;
        Ok(team)
    })
    .unwrap();

    let (member_count, roster_size) = run_roster(&mut conn, &config, auditor(&clock), |roster| {
        let loaded = roster.team_roster(team.id)?.unwrap();
        Ok((roster.members().count()?, loaded.members().len()))
    })
    .unwrap();
    assert_eq!(member_count, 2);
    assert_eq!(roster_size, 1);
}

#[test]
fn failing_unit_of_work_rolls_back_everything() {
    let mut conn = open_db_in_memory().unwrap();
    let config = StoreConfig::default();
    let clock = ManualClock::new(0);

    let err = run_roster(&mut conn, &config, auditor(&clock), |roster| {
        roster.register_team("teamA")?;
        roster.register_member("member1", 10, Some(Uuid::new_v4()))
    })
    .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "Team", .. }));

    let teams = run_roster(&mut conn, &config, auditor(&clock), |roster| {
        roster.teams().count()
    })
    .unwrap();
    assert_eq!(teams, 0);
}

#[test]
fn transfer_member_moves_between_teams() {
    let mut conn = open_db_in_memory().unwrap();
    let config = StoreConfig::default();
    let clock = ManualClock::new(1_000);

    run_roster(&mut conn, &config, auditor(&clock), |roster| {
        let team_a = roster.register_team("teamA")?;
        let team_b = roster.register_team("teamB")?;
        let member = roster.register_member("member1", 10, Some(team_a.id))?;

        clock.set(2_000);
        let transfer = roster.transfer_member(member.id, team_b.id)?;
        assert_eq!(transfer.member.team_id(), Some(team_b.id));
        assert_eq!(transfer.member.audit().updated_at, 2_000);
        assert!(transfer.to.has_member(member.id));
        let left = transfer.from.expect("previous team value");
        assert_eq!(left.id, team_a.id);
        assert!(!left.has_member(member.id));

        assert!(roster.team_roster(team_a.id)?.unwrap().members().is_empty());
        assert!(roster.team_roster(team_b.id)?.unwrap().has_member(member.id));

        let missing = roster.transfer_member(Uuid::new_v4(), team_b.id).unwrap_err();
        assert!(matches!(missing, RepoError::NotFound { entity: "Member", .. }));
        Ok(())
    })
    .unwrap();
}

#[test]
fn bump_then_page_by_age() {
    let mut conn = open_db_in_memory().unwrap();
    let config = StoreConfig::default();
    let clock = ManualClock::new(0);

    let page = run_roster(&mut conn, &config, auditor(&clock), |roster| {
        for name in ["member1", "member2", "member3"] {
            roster.register_member(name, 30, None)?;
        }
        roster.register_member("young", 10, None)?;
        assert_eq!(roster.bump_ages_from(20)?, 3);

        let request = PageRequest::of(0, 2).sorted(SortOrder::asc("username"));
        roster.members_by_age_page(31, &request)
    })
    .unwrap();

    let names: Vec<&str> = page.content.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["member1", "member2"]);
    assert_eq!(page.total_elements, 3);
    assert!(page.has_next);
}
