//! Tag → release synchronization for mirrors.
//!
//! A pull mirror is always identical to its upstream, so after each sync the
//! set of tag-mirrored releases must equal the tag set. The diff is computed
//! in memory and applied in one transaction, which keeps repositories with
//! tens of thousands of tags cheap to resync.

use crate::db::{release, Database};
use crate::error::{MirrorError, Result};
use crate::git::{GitRepository, TagSource};
use crate::models::{FindReleasesOptions, NewRelease, ReleaseRecord, Repository, Tag};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Writes needed to make tag-mirrored releases match the tags.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncPlan<'a> {
    /// Tags with no tag-mirrored release of the same name.
    pub inserts: Vec<&'a Tag>,
    /// Ids of tag-mirrored releases whose tag is gone.
    pub deletes: Vec<i64>,
    /// Tags whose release points at a different object.
    pub updates: Vec<&'a Tag>,
}

impl SyncPlan<'_> {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty() && self.updates.is_empty()
    }
}

/// Counts of rows written by one sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub deleted: usize,
    pub updated: usize,
}

/// Diff `tags` against `releases` by exact tag name.
///
/// Hand-authored releases (`is_tag == false`) take part in neither side of
/// the diff.
pub fn calc_sync<'a>(tags: &'a [Tag], releases: &[ReleaseRecord]) -> SyncPlan<'a> {
    let tag_names: HashSet<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    let mirrored: HashMap<&str, &ReleaseRecord> = releases
        .iter()
        .filter(|r| r.is_tag)
        .map(|r| (r.tag_name.as_str(), r))
        .collect();

    let mut plan = SyncPlan::default();
    for tag in tags {
        match mirrored.get(tag.name.as_str()) {
            None => plan.inserts.push(tag),
            Some(rel) if rel.sha1 != tag.object_id => plan.updates.push(tag),
            Some(_) => {}
        }
    }
    plan.deletes = releases
        .iter()
        .filter(|r| r.is_tag && !tag_names.contains(r.tag_name.as_str()))
        .map(|r| r.id)
        .collect();
    plan
}

/// Make the repository's tag-mirrored releases identical to its tags.
///
/// Reading the tags happens first; the release snapshot, the diff and all
/// writes share one transaction, so either every change lands or none does.
pub async fn sync_releases_with_tags(
    db: &Database,
    repo: &Repository,
    tags: &dyn TagSource,
) -> Result<SyncSummary> {
    debug!("SyncReleasesWithTags: in {}", repo);
    let tags = tags
        .list_tags()
        .await
        .map_err(|e| MirrorError::release_sync(repo.to_string(), "unable to list tags", e))?;

    let summary = db
        .with_tx(|tx| {
            let releases = release::find_releases(tx, &FindReleasesOptions::all(repo.id))
                .map_err(|e| MirrorError::release_sync(repo.to_string(), "unable to find releases", e))?;

            let plan = calc_sync(&tags, &releases);
            if plan.is_empty() {
                return Ok(SyncSummary::default());
            }

            for tag in &plan.inserts {
                release::insert_release(tx, &NewRelease::from_tag(repo.id, tag)).map_err(|e| {
                    MirrorError::release_sync(
                        repo.to_string(),
                        format!("unable to insert tag {}", tag.name),
                        e,
                    )
                })?;
            }

            // Only tag-mirrored rows are ever in `deletes`.
            if !plan.deletes.is_empty() {
                release::delete_releases_by_id(tx, repo.id, &plan.deletes).map_err(|e| {
                    MirrorError::release_sync(repo.to_string(), "unable to delete tags", e)
                })?;
            }

            for tag in &plan.updates {
                release::update_release_sha(
                    tx,
                    repo.id,
                    &tag.name,
                    &tag.object_id,
                    tag.created_unix(),
                )
                .map_err(|e| {
                    MirrorError::release_sync(
                        repo.to_string(),
                        format!("unable to update tag {}", tag.name),
                        e,
                    )
                })?;
            }

            Ok(SyncSummary {
                added: plan.inserts.len(),
                deleted: plan.deletes.len(),
                updated: plan.updates.len(),
            })
        })
        .map_err(|e| match e {
            e @ MirrorError::ReleaseSync { .. } => e,
            e => MirrorError::release_sync(repo.to_string(), "unable to rebuild release table", e),
        })?;

    trace!(
        "SyncReleasesWithTags: {} tags added, {} tags deleted, {} tags updated",
        summary.added,
        summary.deleted,
        summary.updated
    );
    Ok(summary)
}

/// Load a repository by id, open its git directory and sync its releases.
pub async fn sync_repo_tags(db: &Database, repo_id: i64) -> Result<SyncSummary> {
    let repo = db.get_repository_by_id(repo_id)?;
    let git_repo = GitRepository::open(&repo.path).await?;
    sync_releases_with_tags(db, &repo, &git_repo).await
}
