use roster_core::query::{MutationDescriptor, Translator};
use roster_core::schema::MEMBER_SCHEMA;
use roster_core::{
    open_db_in_memory, Executor, Member, MemberRepository, QueryDescriptor, QueryError,
    RepoError, ResultPage, SqliteMemberRepository, SqliteTeamRepository, StoreConfig, Team,
    TeamRepository,
};

fn seed(members: &SqliteMemberRepository<'_>, teams: &SqliteTeamRepository<'_>) {
    let mut team_a = Team::new("teamA");
    let mut team_b = Team::new("teamB");
    teams.save(&mut team_a).unwrap();
    teams.save(&mut team_b).unwrap();
    for (name, age) in [("a1", 20), ("a2", 25), ("a3", 30), ("a4", 15)] {
        members.save(&mut Member::in_team(name, age, &mut team_a)).unwrap();
    }
    members.save(&mut Member::in_team("b1", 40, &mut team_b)).unwrap();
}

#[test]
fn json_descriptor_drives_filtered_sorted_page() {
    let descriptor: QueryDescriptor = serde_json::from_str(
        r#"{
            "predicates": [
                {"field": "age", "op": "ge", "value": 20},
                {"field": "team.name", "op": "eq", "value": "teamA"}
            ],
            "sort": [{"field": "age", "direction": "desc"}],
            "page": {"kind": "page", "index": 0, "size": 2},
            "fetch": ["team"]
        }"#,
    )
    .unwrap();

    let mut conn = open_db_in_memory().unwrap();
    let tx = conn.transaction().unwrap();
    let exec = Executor::new(&tx, &StoreConfig::default());
    let members = SqliteMemberRepository::new(&exec);
    seed(&members, &SqliteTeamRepository::new(&exec));

    let page = members.find_page(&descriptor).unwrap();
    let ages: Vec<i64> = page.content.iter().map(|member| member.age).collect();
    assert_eq!(ages, vec![30, 25]);
    assert_eq!(page.total_elements, 3);
    assert!(page.has_next);
    assert_eq!(page.content[0].team().unwrap().name, "teamA");

    let json = serde_json::to_value(page.map(|member| member.username)).unwrap();
    let decoded: ResultPage<String> = serde_json::from_value(json).unwrap();
    assert_eq!(decoded.content, vec!["a3".to_string(), "a2".to_string()]);
    assert_eq!(decoded.total_pages(), 2);
}

#[test]
fn json_mutation_descriptor_runs_bulk_update() {
    let descriptor: MutationDescriptor = serde_json::from_str(
        r#"{
            "predicates": [{"field": "age", "op": "lt", "value": 18}],
            "kind": {
                "kind": "update",
                "assignments": [{"kind": "set", "field": "username", "value": "minor"}]
            }
        }"#,
    )
    .unwrap();

    let mut conn = open_db_in_memory().unwrap();
    let tx = conn.transaction().unwrap();
    let exec = Executor::new(&tx, &StoreConfig::default());
    let members = SqliteMemberRepository::new(&exec);
    seed(&members, &SqliteTeamRepository::new(&exec));

    let plan = Translator::new(&MEMBER_SCHEMA)
        .compile_mutation(&descriptor)
        .unwrap();
    assert_eq!(exec.run_mutation(&plan).unwrap(), 1);
    assert_eq!(members.find_by_username("minor").unwrap()[0].age, 15);
}

#[test]
fn unknown_fields_fail_before_the_store_is_touched() {
    let descriptor: QueryDescriptor = serde_json::from_str(
        r#"{"predicates": [{"field": "nickname", "op": "eq", "value": "x"}]}"#,
    )
    .unwrap();

    let mut conn = open_db_in_memory().unwrap();
    let tx = conn.transaction().unwrap();
    let exec = Executor::new(&tx, &StoreConfig::default());
    let members = SqliteMemberRepository::new(&exec);

    match members.find_page(&descriptor) {
        Err(RepoError::Query(QueryError::InvalidDescriptor(message))) => {
            assert!(message.contains("nickname"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
