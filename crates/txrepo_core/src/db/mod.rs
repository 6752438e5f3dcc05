//! SQLite storage bootstrap and statement execution entry points.
//!
//! # Responsibility
//! - Own the backing-store handle (`Database`) created once at process start.
//! - Hand out one bootstrapped connection per call.
//! - Provide the connection/transaction agnostic `StatementExecutor`.
//!
//! # Invariants
//! - Core code must not read/write user data before the schema exists.
//! - A connection never outlives the call that acquired it.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod executor;
mod open;
pub mod schema;

pub use executor::StatementExecutor;
pub use open::{Database, DbConnection, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    InvalidPath(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidPath(message) => write!(f, "invalid database path: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidPath(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
