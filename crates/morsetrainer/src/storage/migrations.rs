//! Schema versioning for the attempt database.
//!
//! The base tables are created unconditionally on open; a version key in
//! the `metadata` table records which numbered steps have already run.

use rusqlite::Connection;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// Schema version this build of the crate expects.
pub const SCHEMA_VERSION: i32 = 1;

/// Metadata key holding the applied schema version.
const VERSION_KEY: &str = "schema_version";

/// Numbered migration steps, ordered. Step `n` brings the schema from
/// version `n - 1` to version `n`.
const STEPS: &[fn(&Connection) -> Result<()>] = &[step_initial];

/// Create the base tables and apply any steps the database has not seen.
///
/// Safe to call on every open; already-applied steps are skipped.
///
/// # Errors
///
/// Returns an error if a statement fails or the stored version is
/// unparseable or newer than [`SCHEMA_VERSION`].
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let applied = stored_version(conn)?;
    if applied > SCHEMA_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {applied} is newer than supported {SCHEMA_VERSION}"
            ),
        });
    }

    for (idx, step) in STEPS.iter().enumerate() {
        let version = i32::try_from(idx).unwrap_or(i32::MAX) + 1;
        if version > applied {
            step(conn)?;
            record_version(conn, version)?;
        }
    }

    Ok(())
}

/// Version recorded in the metadata table, or 0 for a fresh database.
fn stored_version(conn: &Connection) -> Result<i32> {
    let row: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match row {
        Ok(raw) => raw.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("unreadable schema version: {raw}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn record_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Step 1: the base schema itself. `SCHEMA_STATEMENTS` has already run,
/// so there is nothing left to do beyond recording the version.
fn step_initial(_conn: &Connection) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_conn() -> Connection {
        Connection::open_in_memory().expect("in-memory database")
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_ensure_schema_creates_both_tables() {
        let conn = fresh_conn();
        ensure_schema(&conn).expect("schema setup");

        assert!(table_exists(&conn, "attempts"));
        assert!(table_exists(&conn, "metadata"));
    }

    #[test]
    fn test_fresh_database_lands_on_current_version() {
        let conn = fresh_conn();
        ensure_schema(&conn).expect("schema setup");

        assert_eq!(stored_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_ensure_schema_twice_is_a_no_op() {
        let conn = fresh_conn();
        ensure_schema(&conn).expect("first open");
        ensure_schema(&conn).expect("second open");

        assert_eq!(stored_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_missing_version_row_reads_as_zero() {
        let conn = fresh_conn();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        assert_eq!(stored_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_record_version_round_trips() {
        let conn = fresh_conn();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        record_version(&conn, 7).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 7);
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let conn = fresh_conn();
        ensure_schema(&conn).unwrap();
        record_version(&conn, SCHEMA_VERSION + 1).unwrap();

        let err = ensure_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_garbage_version_is_an_error() {
        let conn = fresh_conn();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "UPDATE metadata SET value = 'not-a-number' WHERE key = 'schema_version'",
            [],
        )
        .unwrap();

        let err = ensure_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("unreadable schema version"));
    }

    #[test]
    fn test_attempt_indexes_present() {
        let conn = fresh_conn();
        ensure_schema(&conn).expect("schema setup");

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='attempts'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(std::result::Result::ok)
            .collect();

        assert!(indexes.iter().any(|n| n.contains("timestamp")));
        assert!(indexes.iter().any(|n| n.contains("mode")));
    }
}
