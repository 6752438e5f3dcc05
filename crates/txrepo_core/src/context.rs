//! Per-call cancellation and deadline propagation.
//!
//! # Responsibility
//! - Carry a caller supplied deadline and cancel flag into core calls.
//! - Interrupt in-flight SQLite statements once the call is done.
//!
//! # Invariants
//! - A cancelled or expired context never starts new store work.
//! - Interrupted statements surface as `RepoError::Cancelled`.

use crate::repo::user_repo::{RepoError, RepoResult};
use rusqlite::Connection;
use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// SQLite VM instructions between two cancellation checks.
const PROGRESS_CHECK_OPS: c_int = 1_000;

/// Cancellation scope for one store call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

/// Cloneable handle that cancels the context it came from.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl CallContext {
    /// Context without deadline; only cancelled through its handle.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::default(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Returns whether the call was cancelled or ran past its deadline.
    pub fn is_done(&self) -> bool {
        is_done(&self.cancelled, self.deadline)
    }

    /// Fails with `Cancelled` once the context is done.
    pub fn check(&self) -> RepoResult<()> {
        if self.is_done() {
            return Err(RepoError::Cancelled);
        }
        Ok(())
    }

    /// Binds this context to `conn` so running statements get interrupted.
    pub(crate) fn attach(&self, conn: &Connection) {
        let cancelled = Arc::clone(&self.cancelled);
        let deadline = self.deadline;
        conn.progress_handler(
            PROGRESS_CHECK_OPS,
            Some(move || is_done(&cancelled, deadline)),
        );
    }
}

fn is_done(cancelled: &AtomicBool, deadline: Option<Instant>) -> bool {
    cancelled.load(Ordering::SeqCst) || deadline.is_some_and(|at| Instant::now() >= at)
}
