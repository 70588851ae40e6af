//! SQLite persistence for repositories, releases and LFS meta objects.
//!
//! One connection is shared behind a mutex. [`Database::with_tx`] runs a
//! closure inside a transaction; the release query functions take a plain
//! `&Connection` so they work both inside and outside one.

mod lfs_meta;
pub mod release;
mod repository;

use crate::config::DatabaseConfig;
use crate::error::{MirrorError, Result};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS repository (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_name TEXT NOT NULL,
        name TEXT NOT NULL,
        path TEXT NOT NULL,
        is_mirror INTEGER NOT NULL DEFAULT 0,
        UNIQUE (owner_name, name)
    );

    CREATE TABLE IF NOT EXISTS releases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        repo_id INTEGER NOT NULL,
        tag_name TEXT NOT NULL,
        lower_tag_name TEXT NOT NULL,
        sha1 TEXT NOT NULL DEFAULT '',
        num_commits INTEGER NOT NULL DEFAULT -1,
        created_unix INTEGER NOT NULL DEFAULT 0,
        is_tag INTEGER NOT NULL DEFAULT 0,
        is_draft INTEGER NOT NULL DEFAULT 0,
        title TEXT NOT NULL DEFAULT '',
        note TEXT NOT NULL DEFAULT ''
    );

    -- Lookup used when updating a mirrored tag
    CREATE INDEX IF NOT EXISTS idx_releases_repo_lower_tag
        ON releases(repo_id, lower_tag_name);

    -- At most one tag-mirrored row per tag name
    CREATE UNIQUE INDEX IF NOT EXISTS idx_releases_repo_tag_mirror
        ON releases(repo_id, tag_name) WHERE is_tag = 1;

    CREATE TABLE IF NOT EXISTS lfs_meta_object (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        repo_id INTEGER NOT NULL,
        oid TEXT NOT NULL,
        size INTEGER NOT NULL,
        created_unix INTEGER NOT NULL,
        UNIQUE (repo_id, oid)
    );
"#;

/// Handle to the mirror database.
#[derive(Clone)]
pub struct Database {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| MirrorError::Io {
                    message: format!("Failed to create database directory: {}", e),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| MirrorError::Database {
            message: format!("Failed to open database {}: {}", db_path.display(), e),
            source: Some(e),
        })?;
        Self::configure_connection(&conn)?;
        Self::from_connection(conn, Some(db_path.to_path_buf()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(|e| MirrorError::Database {
            message: format!("Failed to initialize schema: {}", e),
            source: Some(e),
        })?;
        debug!(
            "Opened mirror database at {}",
            path.as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string())
        );
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Configure connection with WAL and a busy timeout.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| MirrorError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;
        conn.busy_timeout(DatabaseConfig::BUSY_TIMEOUT)?;
        Ok(())
    }

    /// Path of the database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| MirrorError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }

    /// Run `f` with the shared connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside one transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls the whole transaction
    /// back.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
