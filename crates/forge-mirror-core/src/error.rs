//! Error types for forge-mirror.
//!
//! A single error enum covers the release sync, the LFS backfill and the
//! collaborators they drive (git, SQLite, the content store).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the mirror library.
#[derive(Debug, Error)]
pub enum MirrorError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Version control errors
    #[error("Git error: {message}")]
    Git { message: String },

    #[error("Repository not found: {repo_id}")]
    RepositoryNotFound { repo_id: i64 },

    #[error("Unable to sync releases for {repo}: {message}")]
    ReleaseSync {
        repo: String,
        message: String,
        #[source]
        source: Box<MirrorError>,
    },

    // LFS errors
    #[error("LFS object does not exist: {oid}")]
    ObjectNotExist { oid: String },

    #[error("Invalid LFS pointer: {message}")]
    InvalidPointer { message: String },

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Size mismatch for {oid}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        oid: String,
        expected: i64,
        actual: i64,
    },

    #[error("Error enumerating LFS pointers: {message}")]
    Scan { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

impl From<std::io::Error> for MirrorError {
    fn from(err: std::io::Error) -> Self {
        MirrorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MirrorError {
    fn from(err: rusqlite::Error) -> Self {
        MirrorError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(err: reqwest::Error) -> Self {
        MirrorError::Network {
            message: err.to_string(),
            cause: err.url().map(|u| u.to_string()),
        }
    }
}

impl MirrorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MirrorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Wrap an error raised while syncing releases for `repo`.
    pub fn release_sync(repo: impl Into<String>, message: impl Into<String>, source: MirrorError) -> Self {
        MirrorError::ReleaseSync {
            repo: repo.into(),
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// True when an upstream reported that a single LFS object is missing.
    ///
    /// This is the only per-object error the backfill tolerates.
    pub fn is_object_not_exist(&self) -> bool {
        matches!(self, MirrorError::ObjectNotExist { .. })
    }
}
