//! SQL for the attempt database.

/// DDL run in order on every open. Each statement is idempotent.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // One row per graded drill.
    r"
CREATE TABLE IF NOT EXISTS attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    mode TEXT NOT NULL,
    expected TEXT NOT NULL,
    received TEXT NOT NULL,
    hits INTEGER NOT NULL,
    total INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
",
    // History listings walk newest-first.
    r"
CREATE INDEX IF NOT EXISTS idx_attempts_timestamp ON attempts(timestamp DESC)
",
    r"
CREATE INDEX IF NOT EXISTS idx_attempts_mode ON attempts(mode)
",
    // Key-value bag for the schema version and other bookkeeping.
    r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
",
];
