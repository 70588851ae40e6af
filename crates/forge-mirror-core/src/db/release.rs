//! Release queries.
//!
//! Every function takes a `&Connection` so tag sync can call them on the
//! transaction it holds open.

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{FindReleasesOptions, NewRelease, ReleaseRecord};
use rusqlite::{params, params_from_iter, Connection, Row};

const RELEASE_COLUMNS: &str = "id, repo_id, tag_name, lower_tag_name, sha1, num_commits, \
                               created_unix, is_tag, is_draft, title, note";

fn row_to_release(row: &Row<'_>) -> rusqlite::Result<ReleaseRecord> {
    Ok(ReleaseRecord {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        tag_name: row.get(2)?,
        lower_tag_name: row.get(3)?,
        sha1: row.get(4)?,
        num_commits: row.get(5)?,
        created_unix: row.get(6)?,
        is_tag: row.get(7)?,
        is_draft: row.get(8)?,
        title: row.get(9)?,
        note: row.get(10)?,
    })
}

/// List a repository's releases, ordered by id.
pub fn find_releases(conn: &Connection, opts: &FindReleasesOptions) -> Result<Vec<ReleaseRecord>> {
    let mut sql = format!("SELECT {} FROM releases WHERE repo_id = ?1", RELEASE_COLUMNS);
    if !opts.include_drafts {
        sql.push_str(" AND is_draft = 0");
    }
    if !opts.include_tags {
        sql.push_str(" AND is_tag = 0");
    }
    sql.push_str(" ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let releases = stmt
        .query_map(params![opts.repo_id], row_to_release)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(releases)
}

/// Insert a release, returning its id.
pub fn insert_release(conn: &Connection, release: &NewRelease) -> Result<i64> {
    conn.execute(
        "INSERT INTO releases (repo_id, tag_name, lower_tag_name, sha1, num_commits,
                               created_unix, is_tag, is_draft, title, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            release.repo_id,
            release.tag_name,
            release.lower_tag_name(),
            release.sha1,
            release.num_commits,
            release.created_unix,
            release.is_tag,
            release.is_draft,
            release.title,
            release.note,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete the given release ids of one repository.
///
/// Ids belonging to another repository are left alone.
pub fn delete_releases_by_id(conn: &Connection, repo_id: i64, ids: &[i64]) -> Result<usize> {
    let mut deleted = 0;
    for chunk in ids.chunks(DatabaseConfig::DELETE_CHUNK_SIZE) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "DELETE FROM releases WHERE repo_id = ? AND id IN ({})",
            placeholders
        );
        let values = std::iter::once(repo_id).chain(chunk.iter().copied());
        deleted += conn.execute(&sql, params_from_iter(values))?;
    }
    Ok(deleted)
}

/// Point the tag-mirrored release for `tag_name` at a new object.
///
/// The row is found through `lower_tag_name` and then narrowed to the exact
/// name, so tags differing only in case keep separate rows. Only `sha1` and
/// `created_unix` change; hand-authored releases are never matched.
pub fn update_release_sha(
    conn: &Connection,
    repo_id: i64,
    tag_name: &str,
    sha1: &str,
    created_unix: i64,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE releases SET sha1 = ?1, created_unix = ?2
         WHERE repo_id = ?3 AND lower_tag_name = ?4 AND tag_name = ?5 AND is_tag = 1",
        params![sha1, created_unix, repo_id, tag_name.to_lowercase(), tag_name],
    )?;
    Ok(updated)
}
