//! Repository registry.

use super::Database;
use crate::error::{MirrorError, Result};
use crate::models::{NewRepository, Repository};
use rusqlite::{params, OptionalExtension, Row};
use std::path::PathBuf;

fn row_to_repository(row: &Row<'_>) -> rusqlite::Result<Repository> {
    let path: String = row.get(3)?;
    Ok(Repository {
        id: row.get(0)?,
        owner_name: row.get(1)?,
        name: row.get(2)?,
        path: PathBuf::from(path),
        is_mirror: row.get(4)?,
    })
}

impl Database {
    /// Register a repository.
    pub fn insert_repository(&self, repo: &NewRepository) -> Result<Repository> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO repository (owner_name, name, path, is_mirror) VALUES (?1, ?2, ?3, ?4)",
                params![
                    repo.owner_name,
                    repo.name,
                    repo.path.to_string_lossy().into_owned(),
                    repo.is_mirror
                ],
            )?;
            Ok(Repository {
                id: conn.last_insert_rowid(),
                owner_name: repo.owner_name.clone(),
                name: repo.name.clone(),
                path: repo.path.clone(),
                is_mirror: repo.is_mirror,
            })
        })
    }

    /// Load a repository by id.
    pub fn get_repository_by_id(&self, repo_id: i64) -> Result<Repository> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, owner_name, name, path, is_mirror FROM repository WHERE id = ?1",
                params![repo_id],
                row_to_repository,
            )
            .optional()?
            .ok_or(MirrorError::RepositoryNotFound { repo_id })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let repo = db
            .insert_repository(&NewRepository {
                owner_name: "vim".into(),
                name: "vim".into(),
                path: PathBuf::from("/srv/git/vim/vim.git"),
                is_mirror: true,
            })
            .unwrap();

        let loaded = db.get_repository_by_id(repo.id).unwrap();
        assert_eq!(loaded, repo);
    }

    #[test]
    fn test_unknown_id() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_repository_by_id(99).unwrap_err();
        assert!(matches!(err, MirrorError::RepositoryNotFound { repo_id: 99 }));
    }
}
