use roster_core::{
    open_db_in_memory, Executor, Member, MemberRepository, QueryDescriptor, QueryError,
    SqliteMemberRepository, SqliteTeamRepository, StoreConfig, Team, TeamRepository,
};

fn with_store(
    work: impl FnOnce(&Executor<'_>, &SqliteMemberRepository<'_>, &SqliteTeamRepository<'_>),
) {
    let mut conn = open_db_in_memory().unwrap();
    let tx = conn.transaction().unwrap();
    let exec = Executor::new(&tx, &StoreConfig::default());
    let members = SqliteMemberRepository::new(&exec);
    let teams = SqliteTeamRepository::new(&exec);
    work(&exec, &members, &teams);
}

/// Saves `team` and `count` members linked to it.
fn seed_team(
    members: &SqliteMemberRepository<'_>,
    teams: &SqliteTeamRepository<'_>,
    name: &str,
    count: usize,
) -> (Team, Vec<Member>) {
    let mut team = Team::new(name);
    teams.save(&mut team).unwrap();
    let mut saved = Vec::new();
    for index in 0..count {
        let mut member = Member::in_team(format!("{name}-member{index}"), 10, &mut team);
        members.save(&mut member).unwrap();
        saved.push(member);
    }
    (team, saved)
}

#[test]
fn find_with_members_collapses_joined_rows_into_one_team() {
    with_store(|_, members, teams| {
        let (team_a, roster) = seed_team(members, teams, "teamA", 3);
        let (team_b, _) = seed_team(members, teams, "teamB", 0);

        let loaded = teams.find_with_members(team_a.id).unwrap().unwrap();
        let expected: Vec<_> = roster.iter().map(|member| member.id).collect();
        assert_eq!(loaded.members(), expected.as_slice());

        let empty = teams.find_with_members(team_b.id).unwrap().unwrap();
        assert!(empty.members().is_empty());
    });
}

#[test]
fn paged_to_many_fetch_windows_distinct_teams() {
    with_store(|exec, members, teams| {
        seed_team(members, teams, "teamA", 2);
        seed_team(members, teams, "teamB", 1);
        seed_team(members, teams, "teamC", 0);

        let plan = exec
            .compile::<Team>(&QueryDescriptor::new().fetch("members").page(0, 2))
            .unwrap();
        assert!(plan.paginate_in_memory);

        let first = exec.run_query::<Team>(&plan).unwrap();
        let names: Vec<&str> = first.content.iter().map(|team| team.name.as_str()).collect();
        assert_eq!(names, vec!["teamA", "teamB"]);
        assert_eq!(first.content[0].members().len(), 2);
        assert_eq!(first.total_elements, 3);
        assert!(first.has_next);

        let plan = exec
            .compile::<Team>(&QueryDescriptor::new().fetch("members").page(1, 2))
            .unwrap();
        let second = exec.run_query::<Team>(&plan).unwrap();
        assert_eq!(second.content.len(), 1);
        assert_eq!(second.content[0].name, "teamC");
        assert!(!second.has_next);
    });
}

#[test]
fn deleting_team_with_members_is_constraint_violation() {
    with_store(|_, members, teams| {
        let (busy, _) = seed_team(members, teams, "busy", 1);
        let (idle, _) = seed_team(members, teams, "idle", 0);

        let err = teams.delete(busy.id).unwrap_err();
        assert!(matches!(
            err.query_error(),
            Some(QueryError::ConstraintViolation(_))
        ));
        assert!(teams.find_by_id(busy.id).unwrap().is_some());

        teams.delete(idle.id).unwrap();
        assert!(teams.find_by_id(idle.id).unwrap().is_none());
        assert_eq!(teams.count().unwrap(), 1);
    });
}

#[test]
fn update_renames_team() {
    with_store(|exec, members, teams| {
        let (mut team, _) = seed_team(members, teams, "teamA", 0);
        team.name = "renamed".to_string();
        teams.update(&mut team).unwrap();

        exec.clear();
        let stored = teams.find_by_id(team.id).unwrap().unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(teams.find_all().unwrap().len(), 1);
    });
}
