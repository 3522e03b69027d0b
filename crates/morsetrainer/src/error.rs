//! The crate-wide error type.
//!
//! One enum covers storage, configuration, trainer, and platform
//! failures so callers can bubble everything up with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Anything that can go wrong inside the trainer.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Where the database lives.
        path: PathBuf,
        /// What `SQLite` reported.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// What the migration step hit.
        message: String,
    },

    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Which setting failed and how.
        message: String,
    },

    /// A character has no Morse encoding.
    #[error("character {ch:?} has no morse encoding")]
    UnknownCharacter {
        /// The offending character.
        ch: char,
    },

    /// A speed setting is outside the usable range.
    #[error("invalid speed: {message}")]
    InvalidSpeed {
        /// Description of the bad speed value.
        message: String,
    },

    /// There is no pending drill to check an answer against.
    #[error("no pending {mode} drill; run `morsetrain drill` first")]
    NoPendingDrill {
        /// The practice mode that was asked for.
        mode: String,
    },

    /// A state or parameter file exists but cannot be parsed.
    #[error("malformed file {path}: {message}")]
    Malformed {
        /// The file that would not parse.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// Platform-specific operation failed.
    #[error("platform error: {0}")]
    Platform(String),

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// The directory that could not be made.
        path: PathBuf,
        /// What the filesystem reported.
        #[source]
        source: std::io::Error,
    },

    /// Failed to append to the timing log.
    #[error("failed to append to timing log {path}: {source}")]
    LogAppend {
        /// The log file being written.
        path: PathBuf,
        /// What the filesystem reported.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Shorthand result used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Wrap a platform failure message.
    #[must_use]
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }

    /// Wrap an internal failure message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Build an invalid-speed error from a message.
    #[must_use]
    pub fn invalid_speed(message: impl Into<String>) -> Self {
        Self::InvalidSpeed {
            message: message.into(),
        }
    }

    /// Check if this error means a character is outside the trainer charset.
    #[must_use]
    pub fn is_unknown_character(&self) -> bool {
        matches!(self, Self::UnknownCharacter { .. })
    }
}
