//! SQLite-backed [`LfsMetaStore`].

use super::Database;
use crate::error::Result;
use crate::lfs::{LfsMetaObject, LfsMetaStore, LfsPointer};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::trace;

fn row_to_meta(row: &Row<'_>) -> rusqlite::Result<LfsMetaObject> {
    Ok(LfsMetaObject {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        oid: row.get(2)?,
        size: row.get(3)?,
        created_unix: row.get(4)?,
    })
}

fn query_meta(conn: &Connection, repo_id: i64, oid: &str) -> Result<Option<LfsMetaObject>> {
    let meta = conn
        .query_row(
            "SELECT id, repo_id, oid, size, created_unix FROM lfs_meta_object
             WHERE repo_id = ?1 AND oid = ?2",
            params![repo_id, oid],
            row_to_meta,
        )
        .optional()?;
    Ok(meta)
}

impl LfsMetaStore for Database {
    fn get_meta_object(&self, repo_id: i64, oid: &str) -> Result<Option<LfsMetaObject>> {
        self.with_conn(|conn| query_meta(conn, repo_id, oid))
    }

    fn new_meta_object(&self, repo_id: i64, pointer: &LfsPointer) -> Result<LfsMetaObject> {
        self.with_tx(|tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO lfs_meta_object (repo_id, oid, size, created_unix)
                 VALUES (?1, ?2, ?3, ?4)",
                params![repo_id, pointer.oid, pointer.size, Utc::now().timestamp()],
            )?;
            if inserted == 0 {
                trace!("LFS meta object {} already exists for repo {}", pointer, repo_id);
            }
            query_meta(tx, repo_id, &pointer.oid)?.ok_or_else(|| {
                crate::error::MirrorError::Database {
                    message: format!("LFS meta object {} vanished after insert", pointer),
                    source: None,
                }
            })
        })
    }

    fn remove_meta_object_by_oid(&self, repo_id: i64, oid: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM lfs_meta_object WHERE repo_id = ?1 AND oid = ?2",
                params![repo_id, oid],
            )?)
        })
    }
}

impl Database {
    /// Every LFS meta object of a repository, ordered by oid.
    pub fn list_meta_objects(&self, repo_id: i64) -> Result<Vec<LfsMetaObject>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, repo_id, oid, size, created_unix FROM lfs_meta_object
                 WHERE repo_id = ?1 ORDER BY oid",
            )?;
            let rows = stmt
                .query_map(params![repo_id], row_to_meta)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}
