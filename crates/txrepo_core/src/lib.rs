//! Transactional user store core.
//! This crate is the single source of truth for user persistence invariants.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use context::{CallContext, CancelHandle};
pub use db::{Database, DbConnection, DbError, StatementExecutor};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::user::{User, UserChanges, UserId, UserValidationError};
pub use repo::user_repo::{
    ErrorKind, RepoError, RepoResult, SqliteUserRepository, UserRepository,
};
pub use service::user_store::{StoreError, StoreResult, UserStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
