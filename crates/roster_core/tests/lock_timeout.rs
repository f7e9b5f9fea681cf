use roster_core::{
    open_db, open_db_in_memory, open_db_with, Executor, Member, MemberRepository, QueryError, RepoError,
    SqliteMemberRepository, StoreConfig,
};
use rusqlite::TransactionBehavior;
use std::time::{Duration, Instant};

fn contended_config() -> StoreConfig {
    StoreConfig {
        lock_timeout_ms: 50,
        ..StoreConfig::default()
    }
}

#[test]
fn locked_read_fails_fast_while_another_connection_holds_the_write_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");

    let mut holder = open_db(&path).unwrap();
    {
        let tx = holder.transaction().unwrap();
        let exec = Executor::new(&tx, &StoreConfig::default());
        SqliteMemberRepository::new(&exec)
            .save(&mut Member::new("member1", 10))
            .unwrap();
        drop(exec);
        tx.commit().unwrap();
    }

    let config = contended_config();
    let mut waiter = open_db_with(&path, &config).unwrap();

    let held = holder
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();

    {
        let tx = waiter.transaction().unwrap();
        let exec = Executor::new(&tx, &config);
        let members = SqliteMemberRepository::new(&exec);

        let started_at = Instant::now();
        let err = members.find_lock_by_username("member1").unwrap_err();
        assert!(started_at.elapsed() < Duration::from_secs(2));
        match err {
            RepoError::Query(QueryError::LockUnavailable { timeout_ms }) => {
                assert_eq!(timeout_ms, 50)
            }
            other => panic!("unexpected error: {other}"),
        }

        // Plain reads are not blocked by the held write lock.
        assert_eq!(members.find_by_username("member1").unwrap().len(), 1);
    }

    held.rollback().unwrap();

    let tx = waiter.transaction().unwrap();
    let exec = Executor::new(&tx, &config);
    let locked = SqliteMemberRepository::new(&exec)
        .find_lock_by_username("member1")
        .unwrap();
    assert_eq!(locked.len(), 1);
}

#[test]
fn held_lock_blocks_other_writers_until_transaction_ends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    let config = contended_config();

    let mut first = open_db_with(&path, &config).unwrap();
    {
        let tx = first.transaction().unwrap();
        let exec = Executor::new(&tx, &config);
        SqliteMemberRepository::new(&exec)
            .save(&mut Member::new("member1", 10))
            .unwrap();
        drop(exec);
        tx.commit().unwrap();
    }

    let mut second = open_db_with(&path, &config).unwrap();
    second.busy_timeout(Duration::from_millis(50)).unwrap();

    let tx = first.transaction().unwrap();
    let exec = Executor::new(&tx, &config);
    SqliteMemberRepository::new(&exec)
        .find_lock_by_username("member1")
        .unwrap();

    let blocked = second.execute("UPDATE member SET age = age + 1", []);
    assert!(blocked.is_err());

    drop(exec);
    tx.commit().unwrap();

    assert_eq!(
        second
            .execute("UPDATE member SET age = age + 1", [])
            .unwrap(),
        1
    );
}

#[test]
fn locked_read_restores_the_connection_busy_timeout() {
    let mut conn = open_db_in_memory().unwrap();
    conn.busy_timeout(Duration::from_millis(1_234)).unwrap();

    let tx = conn.transaction().unwrap();
    let exec = Executor::new(&tx, &StoreConfig::default());
    let members = SqliteMemberRepository::new(&exec);
    members.save(&mut Member::new("member1", 10)).unwrap();
    assert_eq!(members.find_lock_by_username("member1").unwrap().len(), 1);

    let busy_timeout_ms: i64 = tx
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(busy_timeout_ms, 1_234);
}
