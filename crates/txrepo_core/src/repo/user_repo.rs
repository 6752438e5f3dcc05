//! User query set contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/find/exists/update APIs over canonical `users` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `User::validate()` before SQL mutations.
//! - Read paths reject invalid persisted identifiers instead of masking them.
//! - `update_user` reports the affected row count and never fails on zero;
//!   callers that need existence guarantees use the transactional store path.

use crate::db::{DbError, StatementExecutor};
use crate::model::user::{User, UserChanges, UserId, UserValidationError};
use rusqlite::{ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const INSERT_USER_SQL: &str = "INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3);";
const SELECT_USER_SQL: &str = "SELECT id, name, email FROM users WHERE id = ?1;";
const SELECT_USERS_SQL: &str = "SELECT id, name, email FROM users ORDER BY rowid ASC;";
const EXISTS_USER_SQL: &str = "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);";
const UPDATE_USER_SQL: &str = "UPDATE users SET name = ?1, email = ?2 WHERE id = ?3;";

pub type RepoResult<T> = Result<T, RepoError>;

/// Flat classification of repository failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    ConstraintViolation,
    NotFound,
    Validation,
    InvalidData,
    Cancelled,
    Transaction,
}

/// Repository error for user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Backing store unavailable or failed in transport.
    Connection(DbError),
    /// Statement rejected by a constraint, e.g. a duplicate id.
    ConstraintViolation(DbError),
    /// No row matches the identifier.
    NotFound(UserId),
    Validation(UserValidationError),
    /// Persisted row cannot be converted into a valid `User`.
    InvalidData(String),
    /// Call cancelled or past its deadline.
    Cancelled,
    /// Unit of work failed and the rollback that followed failed too.
    Transaction {
        cause: Box<RepoError>,
        rollback: Box<RepoError>,
    },
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidData(_) => ErrorKind::InvalidData,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Transaction { .. } => ErrorKind::Transaction,
        }
    }

    /// Rollback failure of a composite error; the unit-of-work failure is
    /// reported through `Error::source`.
    pub fn rollback_error(&self) -> Option<&RepoError> {
        match self {
            Self::Transaction { rollback, .. } => Some(rollback.as_ref()),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "{err}"),
            Self::ConstraintViolation(err) => write!(f, "constraint violation: {err}"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::Transaction { cause, rollback } => {
                write!(f, "tx err: {cause}, rb err: {rollback}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) => Some(err),
            Self::ConstraintViolation(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Transaction { cause, .. } => Some(cause.as_ref()),
            Self::NotFound(_) | Self::InvalidData(_) | Self::Cancelled => None,
        }
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Connection(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => {
                Self::ConstraintViolation(DbError::Sqlite(value))
            }
            Some(ErrorCode::OperationInterrupted) => Self::Cancelled,
            _ => Self::Connection(DbError::Sqlite(value)),
        }
    }
}

/// Query set over the `users` table.
///
/// Object safe so transactional units of work can receive `&dyn
/// UserRepository` without knowing the executor behind it.
pub trait UserRepository {
    /// Inserts a new user and returns its id.
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    /// Loads one user, failing with `NotFound` when absent.
    fn find_user(&self, id: UserId) -> RepoResult<User>;
    /// Loads every user; empty storage yields an empty vector.
    fn find_users(&self) -> RepoResult<Vec<User>>;
    /// Returns whether a user with `id` is stored. Absence is not an error.
    fn exists_user(&self, id: UserId) -> RepoResult<bool>;
    /// Rewrites `name`/`email` for `id` and returns the affected row count.
    fn update_user(&self, id: UserId, changes: &UserChanges) -> RepoResult<usize>;
}

/// SQLite-backed user query set bound to one statement executor.
pub struct SqliteUserRepository<'e, E: StatementExecutor> {
    executor: &'e E,
}

impl<'e, E: StatementExecutor> SqliteUserRepository<'e, E> {
    pub fn new(executor: &'e E) -> Self {
        Self { executor }
    }
}

impl<E: StatementExecutor> UserRepository for SqliteUserRepository<'_, E> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        self.executor.execute(
            INSERT_USER_SQL,
            &[&user.id.to_string(), &user.name, &user.email],
        )?;

        Ok(user.id)
    }

    fn find_user(&self, id: UserId) -> RepoResult<User> {
        self.executor
            .query_one(SELECT_USER_SQL, &[&id.to_string()], parse_user_row)?
            .ok_or(RepoError::NotFound(id))
    }

    fn find_users(&self) -> RepoResult<Vec<User>> {
        self.executor
            .query_many(SELECT_USERS_SQL, &[], parse_user_row)
    }

    fn exists_user(&self, id: UserId) -> RepoResult<bool> {
        let exists: Option<i64> = self
            .executor
            .query_one(EXISTS_USER_SQL, &[&id.to_string()], |row| {
                row.get::<_, i64>(0).map_err(RepoError::from)
            })?;
        Ok(exists == Some(1))
    }

    fn update_user(&self, id: UserId, changes: &UserChanges) -> RepoResult<usize> {
        let changed = self.executor.execute(
            UPDATE_USER_SQL,
            &[&changes.name, &changes.email, &id.to_string()],
        )?;
        Ok(changed)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in users.id"))
    })?;

    Ok(User {
        id,
        name: row.get("name")?,
        email: row.get("email")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, RepoError};
    use crate::db::DbError;
    use rusqlite::Connection;
    use std::error::Error;
    use uuid::Uuid;

    #[test]
    fn unique_violation_is_classified_as_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: RepoError = conn
            .execute("INSERT INTO t VALUES ('a');", [])
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn other_sqlite_failures_are_connection_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let err: RepoError = conn
            .execute("INSERT INTO missing_table VALUES (1);", [])
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err: RepoError = DbError::InvalidPath("x".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn composite_error_keeps_both_causes() {
        let id = Uuid::new_v4();
        let err = RepoError::Transaction {
            cause: Box::new(RepoError::NotFound(id)),
            rollback: Box::new(RepoError::Cancelled),
        };
        let message = err.to_string();
        assert!(message.contains(&id.to_string()));
        assert!(message.contains("operation cancelled"));
        assert_eq!(err.kind(), ErrorKind::Transaction);

        let cause = Error::source(&err)
            .and_then(|source| source.downcast_ref::<RepoError>())
            .unwrap();
        assert_eq!(cause.kind(), ErrorKind::NotFound);
        assert_eq!(err.rollback_error().map(RepoError::kind), Some(ErrorKind::Cancelled));
    }

    #[test]
    fn plain_errors_carry_no_rollback_error() {
        assert!(RepoError::Cancelled.rollback_error().is_none());
        assert!(RepoError::NotFound(Uuid::new_v4()).rollback_error().is_none());
    }
}
