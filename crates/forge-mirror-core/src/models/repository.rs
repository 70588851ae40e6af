//! Repository rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A repository known to the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: i64,
    pub owner_name: String,
    pub name: String,
    /// Path of the bare git directory on disk.
    pub path: PathBuf,
    pub is_mirror: bool,
}

/// Values for registering a repository.
#[derive(Debug, Clone)]
pub struct NewRepository {
    pub owner_name: String,
    pub name: String,
    pub path: PathBuf,
    pub is_mirror: bool,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_name, self.name)
    }
}

/// Formats as `Repo[id:owner/name]`, the identity used in log lines.
impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Repo[{}:{}/{}]", self.id, self.owner_name, self.name)
    }
}
