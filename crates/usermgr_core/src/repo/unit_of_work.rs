//! Scoped unit-of-work primitive shared by every repository operation.
//!
//! # Responsibility
//! - Acquire a session and transaction from the factory's live handle.
//! - Run exactly one storage operation inside that transaction.
//! - Commit on success, roll back on failure, release the session always.
//!
//! # Invariants
//! - Rollback happens before the caller sees the failure.
//! - The session is dropped on every exit path, including commit failure.

use crate::db::ConnectionFactory;
use crate::repo::user_repo::RepoResult;
use log::{debug, error, warn};
use rusqlite::Transaction;
use std::time::Instant;

/// Runs `work` as one unit of work against `factory`.
///
/// # Errors
/// - `RepoError::Init` when the handle cannot be built.
/// - `RepoError::Db` when the session, begin or commit fails.
/// - Whatever `work` returns, after the transaction has been rolled back.
pub fn with_unit_of_work<T, F>(
    factory: &ConnectionFactory,
    operation: &'static str,
    work: F,
) -> RepoResult<T>
where
    F: FnOnce(&Transaction<'_>) -> RepoResult<T>,
{
    let started_at = Instant::now();
    let handle = factory.get_handle()?;
    let mut session = handle.open_session()?;
    let tx = session.begin()?;

    match work(&tx) {
        Ok(value) => {
            if let Err(err) = tx.commit() {
                warn!(
                    "event=uow_rollback module=repo status=error op={} stage=commit error={}",
                    operation, err
                );
                return Err(err.into());
            }
            debug!(
                "event=uow_commit module=repo status=ok op={} duration_ms={}",
                operation,
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            match tx.rollback() {
                Ok(()) => warn!(
                    "event=uow_rollback module=repo status=ok op={} error={}",
                    operation, err
                ),
                Err(rollback_err) => error!(
                    "event=uow_rollback module=repo status=error op={} error={} rollback_error={}",
                    operation, err, rollback_err
                ),
            }
            Err(err)
        }
    }
}
