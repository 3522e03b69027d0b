//! `SQLite`-backed history of scored drills.
//!
//! Every graded drill lands here as an [`Attempt`]; the `history` and
//! `stats` commands read it back out.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::Mode;

/// One scored drill, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// Database ID, `None` before insertion.
    pub id: Option<i64>,
    /// When the drill was scored.
    pub timestamp: DateTime<Utc>,
    /// Which half of the trainer the drill exercised.
    pub mode: Mode,
    /// Text the drill asked for.
    pub expected: String,
    /// Text the user produced.
    pub received: String,
    /// Characters answered correctly.
    pub hits: i64,
    /// Characters scored.
    pub total: i64,
}

impl Attempt {
    /// Build an unsaved attempt stamped with the current time.
    #[must_use]
    pub fn new(mode: Mode, expected: &str, received: &str, hits: usize, total: usize) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            mode,
            expected: expected.to_string(),
            received: received.to_string(),
            hits: i64::try_from(hits).unwrap_or(i64::MAX),
            total: i64::try_from(total).unwrap_or(i64::MAX),
        }
    }
}

/// Storage engine for drill attempts.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open the database at `path`, creating file, parent directories,
    /// and schema as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema
    /// cannot be brought up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("opening attempt database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps history reads cheap while a drill is being recorded.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::ensure_schema(&conn)?;

        info!("attempt database ready at {}", path.display());
        Ok(Self { path, conn })
    }

    /// In-memory database, used by tests.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::ensure_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Location of the backing database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an attempt and return its row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert(&self, attempt: &Attempt) -> Result<i64> {
        let mode = attempt.mode.to_string();
        let timestamp = attempt.timestamp.to_rfc3339();

        self.conn.execute(
            r"
            INSERT INTO attempts (timestamp, mode, expected, received, hits, total)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                timestamp,
                mode,
                attempt.expected,
                attempt.received,
                attempt.hits,
                attempt.total,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("recorded attempt {}", id);
        Ok(id)
    }

    /// Look up a single attempt by row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: i64) -> Result<Option<Attempt>> {
        let result = self
            .conn
            .query_row(
                r"
                SELECT id, timestamp, mode, expected, received, hits, total
                FROM attempts WHERE id = ?1
                ",
                [id],
                Self::row_to_attempt,
            )
            .optional()?;
        Ok(result)
    }

    /// The newest `limit` attempts across both modes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_recent(&self, limit: usize) -> Result<Vec<Attempt>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, timestamp, mode, expected, received, hits, total
            FROM attempts ORDER BY timestamp DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let attempts = stmt
            .query_map([limit_i64], Self::row_to_attempt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(attempts)
    }

    /// The newest `limit` attempts in one mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_by_mode(&self, mode: Mode, limit: usize) -> Result<Vec<Attempt>> {
        let mode_str = mode.to_string();
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, timestamp, mode, expected, received, hits, total
            FROM attempts WHERE mode = ?1
            ORDER BY timestamp DESC LIMIT ?2
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let attempts = stmt
            .query_map(params![mode_str, limit_i64], Self::row_to_attempt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(attempts)
    }

    /// Number of attempts on record.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM attempts", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Lifetime `(hits, total)` sums for one mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn accuracy(&self, mode: Mode) -> Result<(i64, i64)> {
        let mode_str = mode.to_string();
        let (hits, total): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT SUM(hits), SUM(total) FROM attempts WHERE mode = ?1",
            [mode_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((hits.unwrap_or(0), total.unwrap_or(0)))
    }

    /// Delete attempts older than `max_age` and return how many went.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let cutoff_str = cutoff.to_rfc3339();

        let affected = self
            .conn
            .execute("DELETE FROM attempts WHERE timestamp < ?1", [cutoff_str])?;

        if affected > 0 {
            info!("pruned {} old attempts", affected);
        }
        Ok(affected)
    }

    /// Summary of what the database holds.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_attempts = self.count()?;

        let oldest: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM attempts ORDER BY timestamp ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM attempts ORDER BY timestamp DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let oldest_attempt = oldest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let newest_attempt = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_attempts,
            oldest_attempt,
            newest_attempt,
            db_size_bytes,
        })
    }

    fn row_to_attempt(row: &rusqlite::Row) -> rusqlite::Result<Attempt> {
        let id: i64 = row.get(0)?;
        let timestamp_str: String = row.get(1)?;
        let mode_str: String = row.get(2)?;
        let expected: String = row.get(3)?;
        let received: String = row.get(4)?;
        let hits: i64 = row.get(5)?;
        let total: i64 = row.get(6)?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        let mode = match mode_str.as_str() {
            "send" => Mode::Send,
            "copy" => Mode::Copy,
            other => {
                warn!("attempt row carries unknown mode {:?}, treating as copy", other);
                Mode::Copy
            }
        };

        Ok(Attempt {
            id: Some(id),
            timestamp,
            mode,
            expected,
            received,
            hits,
            total,
        })
    }
}

/// What [`Storage::stats`] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Attempts on record.
    pub total_attempts: i64,
    /// When the oldest attempt was scored.
    pub oldest_attempt: Option<DateTime<Utc>>,
    /// When the newest attempt was scored.
    pub newest_attempt: Option<DateTime<Utc>>,
    /// On-disk size, 0 for in-memory databases.
    pub db_size_bytes: u64,
}
