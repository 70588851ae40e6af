//! Per-repository LFS object records.

use crate::error::Result;
use crate::lfs::pointer::LfsPointer;
use serde::{Deserialize, Serialize};

/// Records that a repository's history references an LFS object.
///
/// The record says nothing about whether the bytes are stored; the backfill
/// removes it again when storing the content fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LfsMetaObject {
    pub id: i64,
    pub repo_id: i64,
    pub oid: String,
    pub size: i64,
    pub created_unix: i64,
}

impl LfsMetaObject {
    pub fn pointer(&self) -> LfsPointer {
        LfsPointer::new(self.oid.clone(), self.size)
    }
}

/// Storage of [`LfsMetaObject`] rows.
///
/// All operations are synchronous to match rusqlite's API.
pub trait LfsMetaStore: Send + Sync {
    /// Look up the record for `(repo_id, oid)`; `None` when absent.
    fn get_meta_object(&self, repo_id: i64, oid: &str) -> Result<Option<LfsMetaObject>>;

    /// Create the record for `(repo_id, pointer)`, returning the existing row
    /// if one is already there.
    fn new_meta_object(&self, repo_id: i64, pointer: &LfsPointer) -> Result<LfsMetaObject>;

    /// Delete the record for `(repo_id, oid)`, returning how many rows went.
    fn remove_meta_object_by_oid(&self, repo_id: i64, oid: &str) -> Result<usize>;
}
