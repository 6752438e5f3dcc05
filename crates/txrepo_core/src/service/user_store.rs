//! User store facade.
//!
//! # Responsibility
//! - Single entry point for request layers (create, find, list, exists,
//!   conditional update).
//! - Route plain reads/writes to a connection-bound query set and the
//!   conditional update through the transaction coordinator.
//!
//! # Invariants
//! - Identifiers are minted here on create and never taken from update input.
//! - An update of a missing user fails with `NotFound` and writes nothing.
//! - Errors keep their kind across this boundary; only the operation name and
//!   user id are added.

use crate::context::CallContext;
use crate::db::Database;
use crate::model::user::{User, UserChanges, UserId};
use crate::repo::user_repo::{
    ErrorKind, RepoError, RepoResult, SqliteUserRepository, UserRepository,
};
use crate::service::transaction::TransactionCoordinator;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Facade error: a repository error plus the call that produced it.
#[derive(Debug)]
pub struct StoreError {
    operation: &'static str,
    user_id: Option<UserId>,
    source: RepoError,
}

impl StoreError {
    pub fn new(operation: &'static str, user_id: Option<UserId>, source: RepoError) -> Self {
        Self {
            operation,
            user_id,
            source,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Kind of the underlying repository error.
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn repo_error(&self) -> &RepoError {
        &self.source
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.user_id {
            Some(id) => write!(f, "{} failed for user {id}: {}", self.operation, self.source),
            None => write!(f, "{} failed: {}", self.operation, self.source),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Store facade over one backing-store handle.
pub struct UserStore {
    db: Database,
}

impl UserStore {
    /// Creates a store owning the process-wide database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Mints a new identifier, persists the user and returns it.
    pub fn create_user(
        &self,
        ctx: &CallContext,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> StoreResult<User> {
        let user = User::new(name, email);
        let result = self.with_repo(ctx, |repo| repo.create_user(&user));
        finish_call("create_user", Some(user.id), result.map(|_| user))
    }

    /// Loads one user, failing with `NotFound` when absent.
    pub fn find_user(&self, ctx: &CallContext, id: UserId) -> StoreResult<User> {
        let result = self.with_repo(ctx, |repo| repo.find_user(id));
        finish_call("find_user", Some(id), result)
    }

    /// Loads every user; empty storage is an empty vector, not an error.
    pub fn find_users(&self, ctx: &CallContext) -> StoreResult<Vec<User>> {
        let result = self.with_repo(ctx, |repo| repo.find_users());
        finish_call("find_users", None, result)
    }

    pub fn user_exists(&self, ctx: &CallContext, id: UserId) -> StoreResult<bool> {
        let result = self.with_repo(ctx, |repo| repo.exists_user(id));
        finish_call("user_exists", Some(id), result)
    }

    /// Rewrites `name`/`email` of an existing user inside one transaction.
    ///
    /// Returns the stored record after the update, with its original id.
    pub fn update_user_transactionally(
        &self,
        ctx: &CallContext,
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> StoreResult<User> {
        let changes = UserChanges::new(name, email);
        let result = TransactionCoordinator::new(&self.db).run(
            ctx,
            "update_user_transactionally",
            |repo| update_existing_user(repo, id, &changes),
        );
        finish_call("update_user_transactionally", Some(id), result)
    }

    fn with_repo<T>(
        &self,
        ctx: &CallContext,
        query: impl FnOnce(&dyn UserRepository) -> RepoResult<T>,
    ) -> RepoResult<T> {
        ctx.check()?;
        let conn = self.db.connect()?;
        // In-memory connects may have queued behind another call.
        ctx.check()?;
        ctx.attach(&conn);
        let repo = SqliteUserRepository::new(&conn);
        query(&repo)
    }
}

/// Conditional update: verifies existence, then updates and reads back, all
/// through the same transaction-scoped query set.
pub(crate) fn update_existing_user(
    repo: &dyn UserRepository,
    id: UserId,
    changes: &UserChanges,
) -> RepoResult<User> {
    if !repo.exists_user(id)? {
        return Err(RepoError::NotFound(id));
    }
    if repo.update_user(id, changes)? == 0 {
        return Err(RepoError::NotFound(id));
    }
    repo.find_user(id)
}

fn finish_call<T>(
    operation: &'static str,
    user_id: Option<UserId>,
    result: RepoResult<T>,
) -> StoreResult<T> {
    let id_label = user_id.map_or_else(|| "-".to_string(), |id| id.to_string());
    match result {
        Ok(value) => {
            debug!("event=store_call module=service status=ok operation={operation} user_id={id_label}");
            Ok(value)
        }
        Err(err) => {
            if err.kind() == ErrorKind::NotFound {
                info!(
                    "event=store_call module=service status=not_found operation={operation} user_id={id_label}"
                );
            } else {
                warn!(
                    "event=store_call module=service status=error operation={operation} user_id={id_label} error_kind={:?} error={err}",
                    err.kind()
                );
            }
            Err(StoreError::new(operation, user_id, err))
        }
    }
}
