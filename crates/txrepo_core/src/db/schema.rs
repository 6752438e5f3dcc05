//! Embedded `users` schema.
//!
//! # Invariants
//! - Schema bootstrap is idempotent and runs before any user data access.
//! - `users` is the only table owned by core.

use crate::db::DbResult;
use rusqlite::Connection;

/// Name of the single table owned by core.
pub const USERS_TABLE: &str = "users";

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Creates the `users` table when it does not exist yet.
pub fn ensure_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ensure_schema, USERS_TABLE};
    use rusqlite::Connection;

    #[test]
    fn ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let columns: Vec<String> = conn
            .prepare(&format!("PRAGMA table_info({USERS_TABLE});"))
            .unwrap()
            .query_map([], |row| row.get(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(columns, vec!["id", "name", "email"]);
    }
}
