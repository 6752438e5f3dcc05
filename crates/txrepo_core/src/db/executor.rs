//! Statement execution over a connection or an open transaction.
//!
//! # Responsibility
//! - Expose one execute/query surface regardless of transactional context.
//! - Release prepared statements and row cursors on every exit path.
//!
//! # Invariants
//! - Implementors never begin, commit or roll back transactions.

use super::open::DbConnection;
use rusqlite::{Connection, Row, Statement, ToSql, Transaction};

/// Capability to run parameterized SQL.
///
/// Implemented for [`Connection`], [`DbConnection`] and [`Transaction`], so
/// query code bound to this trait runs unchanged inside or outside a
/// transaction.
pub trait StatementExecutor {
    /// Prepares one statement on the underlying handle.
    fn prepare_statement(&self, sql: &str) -> rusqlite::Result<Statement<'_>>;

    /// Runs a mutating statement and returns the affected row count.
    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize> {
        let mut stmt = self.prepare_statement(sql)?;
        stmt.execute(params)
    }

    /// Runs a statement expected to yield zero or one row.
    ///
    /// Rows past the first are ignored.
    fn query_one<T, E, F>(&self, sql: &str, params: &[&dyn ToSql], map: F) -> Result<Option<T>, E>
    where
        E: From<rusqlite::Error>,
        F: FnOnce(&Row<'_>) -> Result<T, E>,
    {
        let mut stmt = self.prepare_statement(sql)?;
        let mut rows = stmt.query(params)?;
        let value = match rows.next()? {
            Some(row) => Some(map(row)?),
            None => None,
        };
        Ok(value)
    }

    /// Runs a statement yielding zero or more rows, mapping each one.
    ///
    /// The cursor is dropped as soon as mapping fails or the rows run out.
    fn query_many<T, E, F>(&self, sql: &str, params: &[&dyn ToSql], mut map: F) -> Result<Vec<T>, E>
    where
        E: From<rusqlite::Error>,
        F: FnMut(&Row<'_>) -> Result<T, E>,
    {
        let mut stmt = self.prepare_statement(sql)?;
        let mut rows = stmt.query(params)?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(map(row)?);
        }
        Ok(values)
    }
}

impl StatementExecutor for Connection {
    fn prepare_statement(&self, sql: &str) -> rusqlite::Result<Statement<'_>> {
        self.prepare(sql)
    }
}

impl StatementExecutor for DbConnection<'_> {
    fn prepare_statement(&self, sql: &str) -> rusqlite::Result<Statement<'_>> {
        self.prepare(sql)
    }
}

impl StatementExecutor for Transaction<'_> {
    fn prepare_statement(&self, sql: &str) -> rusqlite::Result<Statement<'_>> {
        self.prepare(sql)
    }
}
