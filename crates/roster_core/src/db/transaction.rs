//! Caller-scoped transaction boundary.
//!
//! Query execution never begins or commits on its own; units of work run
//! inside [`run_in_transaction`], which commits on `Ok` and rolls back on
//! `Err` (dropping an uncommitted `Transaction` rolls it back).

use log::{debug, error, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Runs `work` inside one transaction on `conn`.
///
/// `behavior` follows SQLite semantics: `Immediate` takes the write lock at
/// begin, `Deferred` on the first write.
///
/// # Errors
/// - `work`'s own error, unchanged, even when the rollback that follows it
///   fails (that failure is logged).
/// - Begin or commit failures.
pub fn run_in_transaction<T, E, F>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    work: F,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
{
    let started_at = Instant::now();
    let tx = conn.transaction_with_behavior(behavior)?;
    match work(&tx) {
        Ok(value) => {
            tx.commit()?;
            debug!(
                "event=tx module=db status=commit duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            match tx.rollback() {
                Ok(()) => warn!(
                    "event=tx module=db status=rollback duration_ms={}",
                    started_at.elapsed().as_millis()
                ),
                Err(rollback_err) => error!(
                    "event=tx module=db status=error error_code=rollback_failed duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    rollback_err
                ),
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::run_in_transaction;
    use crate::db::{open_db_in_memory, DbError};
    use rusqlite::TransactionBehavior;

    fn team_count(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM team", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn ok_commits_and_err_rolls_back() {
        let mut conn = open_db_in_memory().unwrap();

        run_in_transaction(&mut conn, TransactionBehavior::Immediate, |tx| {
            tx.execute(
                "INSERT INTO team (team_id, name, created_at, updated_at) VALUES ('t1', 'teamA', 0, 0)",
                [],
            )?;
            Ok::<_, DbError>(())
        })
        .unwrap();

        let result: Result<(), DbError> =
            run_in_transaction(&mut conn, TransactionBehavior::Deferred, |tx| {
                tx.execute(
                    "INSERT INTO team (team_id, name, created_at, updated_at) VALUES ('t2', 'teamB', 0, 0)",
                    [],
                )?;
                Err(DbError::UnsupportedSchemaVersion {
                    db_version: 7,
                    latest_supported: 1,
                })
            });

        assert!(result.is_err());
        assert_eq!(team_count(&conn), 1);
    }

    #[test]
    fn failed_rollback_keeps_the_work_error() {
        let mut conn = open_db_in_memory().unwrap();

        let result: Result<(), DbError> =
            run_in_transaction(&mut conn, TransactionBehavior::Deferred, |tx| {
                // Ending the transaction early makes the later ROLLBACK fail.
                tx.execute_batch("ROLLBACK;")?;
                Err(DbError::UnsupportedSchemaVersion {
                    db_version: 7,
                    latest_supported: 1,
                })
            });

        assert!(matches!(
            result,
            Err(DbError::UnsupportedSchemaVersion { db_version: 7, .. })
        ));
        assert!(conn.is_autocommit());
    }
}
