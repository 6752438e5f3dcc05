//! Backing-store handle and per-call connection bootstrap.
//!
//! # Responsibility
//! - Resolve file or in-memory SQLite targets once at process start.
//! - Configure connection pragmas required by core behavior.
//! - Ensure the `users` schema exists before the handle is returned.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout set.
//! - In-memory handles keep an anchor connection open so per-call
//!   connections share one database.
//! - In-memory calls are serialized on the anchor lock: shared-cache
//!   connections report table locks as `SQLITE_LOCKED`, which the busy
//!   timeout never retries.

use super::schema::ensure_schema;
use super::{DbError, DbResult};
use crate::config::StoreConfig;
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Busy timeout applied when no explicit value is configured.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File(PathBuf),
    Memory(String),
}

/// Backing-store handle shared by every call of a process.
///
/// The handle itself holds no open transaction; each call acquires its own
/// connection through [`Database::connect`] and drops it when done.
#[derive(Debug)]
pub struct Database {
    target: Target,
    busy_timeout: Duration,
    anchor: Option<Mutex<Connection>>,
}

/// Connection owned by one call.
///
/// For in-memory handles it also holds the anchor lock, so at most one call
/// touches the shared cache at a time. The connection closes before the lock
/// is released.
pub struct DbConnection<'db> {
    conn: Connection,
    _gate: Option<MutexGuard<'db, Connection>>,
}

impl Deref for DbConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for DbConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Database {
    /// Opens (or creates) a SQLite database file and ensures the schema.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open_file(path.as_ref(), DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens a private in-memory database and ensures the schema.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open_memory(DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens the database described by `config`.
    ///
    /// A missing `db_path` selects a private in-memory database.
    pub fn from_config(config: &StoreConfig) -> DbResult<Self> {
        match config.db_path.as_deref() {
            Some(path) => Self::open_file(path, config.busy_timeout),
            None => Self::open_memory(config.busy_timeout),
        }
    }

    /// Returns whether this handle points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.target, Target::Memory(_))
    }

    /// Acquires a fresh bootstrapped connection for a single call.
    ///
    /// The caller owns the connection; dropping it releases every resource,
    /// including any transaction left open on an early return or panic.
    /// In-memory handles block here while another call holds a connection.
    pub fn connect(&self) -> DbResult<DbConnection<'_>> {
        // A panicking call only poisons the lock; the idle anchor is intact.
        let gate = self
            .anchor
            .as_ref()
            .map(|anchor| anchor.lock().unwrap_or_else(PoisonError::into_inner));
        let conn = self.open_connection()?;
        Ok(DbConnection { conn, _gate: gate })
    }

    fn open_connection(&self) -> DbResult<Connection> {
        let conn = match &self.target {
            Target::File(path) => Connection::open(path)?,
            Target::Memory(uri) => Connection::open_with_flags(uri, OpenFlags::default())?,
        };
        bootstrap_connection(&conn, self.busy_timeout)?;
        Ok(conn)
    }

    fn open_file(path: &Path, busy_timeout: Duration) -> DbResult<Self> {
        if path.as_os_str().is_empty() {
            return Err(DbError::InvalidPath("path cannot be empty".to_string()));
        }

        let db = Self {
            target: Target::File(path.to_path_buf()),
            busy_timeout,
            anchor: None,
        };
        db.initialize("file")?;
        Ok(db)
    }

    fn open_memory(busy_timeout: Duration) -> DbResult<Self> {
        let uri = format!(
            "file:txrepo-{}?mode=memory&cache=shared",
            Uuid::new_v4().simple()
        );
        let mut db = Self {
            target: Target::Memory(uri),
            busy_timeout,
            anchor: None,
        };
        let anchor = db.initialize("memory")?;
        db.anchor = Some(Mutex::new(anchor));
        Ok(db)
    }

    fn initialize(&self, mode: &str) -> DbResult<Connection> {
        let started_at = Instant::now();
        info!("event=db_open module=db status=start mode={mode}");

        let conn = match self.open_connection() {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        match ensure_schema(&conn) {
            Ok(()) => {
                info!(
                    "event=db_open module=db status=ok mode={mode} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(conn)
            }
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_schema_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn bootstrap_connection(conn: &Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}
