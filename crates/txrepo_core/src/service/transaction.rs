//! All-or-nothing execution of user units of work.
//!
//! # Responsibility
//! - Open one transaction per call and bind a query set to it.
//! - Commit on success, roll back on failure.
//!
//! # Invariants
//! - A failed rollback never hides the unit-of-work error: both are kept in
//!   `RepoError::Transaction`.
//! - No state is retained across calls; every run acquires its own
//!   connection.
//! - Transactions start `IMMEDIATE`, so the write lock is held from the first
//!   read of the unit of work until commit or rollback.
//! - A panic inside the unit of work drops the transaction, which rolls back.

use crate::context::CallContext;
use crate::db::Database;
use crate::repo::user_repo::{RepoError, RepoResult, SqliteUserRepository, UserRepository};
use log::{debug, error, warn};
use rusqlite::{Transaction, TransactionBehavior};

/// Commit/rollback capability of an open transaction.
pub(crate) trait TransactionScope {
    fn commit(self) -> RepoResult<()>;
    fn rollback(self) -> RepoResult<()>;
}

impl TransactionScope for Transaction<'_> {
    fn commit(self) -> RepoResult<()> {
        Transaction::commit(self)?;
        Ok(())
    }

    fn rollback(self) -> RepoResult<()> {
        // SQLite already rolled back, e.g. after an interrupted statement.
        if self.is_autocommit() {
            return Ok(());
        }
        Transaction::rollback(self)?;
        Ok(())
    }
}

/// Runs units of work inside transactions opened against one database.
pub(crate) struct TransactionCoordinator<'db> {
    db: &'db Database,
}

impl<'db> TransactionCoordinator<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Runs `unit_of_work` against a query set bound to a fresh transaction.
    ///
    /// `operation` only labels log events.
    pub(crate) fn run<T, F>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        unit_of_work: F,
    ) -> RepoResult<T>
    where
        F: FnOnce(&dyn UserRepository) -> RepoResult<T>,
    {
        ctx.check()?;
        let mut conn = self.db.connect()?;
        ctx.check()?;
        ctx.attach(&conn);

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!("event=tx_begin module=service status=ok operation={operation}");

        let outcome = {
            let repo = SqliteUserRepository::new(&tx);
            unit_of_work(&repo)
        };
        finish(tx, operation, outcome)
    }
}

/// Commits or rolls back `scope` according to `outcome`.
pub(crate) fn finish<S, T>(scope: S, operation: &'static str, outcome: RepoResult<T>) -> RepoResult<T>
where
    S: TransactionScope,
{
    match outcome {
        Ok(value) => match scope.commit() {
            Ok(()) => {
                debug!("event=tx_commit module=service status=ok operation={operation}");
                Ok(value)
            }
            Err(err) => {
                error!(
                    "event=tx_commit module=service status=error operation={operation} error={err}"
                );
                Err(err)
            }
        },
        Err(cause) => match scope.rollback() {
            Ok(()) => {
                debug!(
                    "event=tx_rollback module=service status=ok operation={operation} cause={cause}"
                );
                Err(cause)
            }
            Err(rollback) => {
                warn!(
                    "event=tx_rollback module=service status=error operation={operation} cause={cause} error={rollback}"
                );
                Err(RepoError::Transaction {
                    cause: Box::new(cause),
                    rollback: Box::new(rollback),
                })
            }
        },
    }
}
