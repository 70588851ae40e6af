//! Release rows.

use serde::{Deserialize, Serialize};

/// `num_commits` value for releases whose commit count has not been
/// computed yet. Tag sync never computes it.
pub const NUM_COMMITS_NOT_COMPUTED: i64 = -1;

/// A persisted release.
///
/// `is_tag` distinguishes rows mirrored from a tag from hand-authored
/// releases; only the former are owned by tag sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub id: i64,
    pub repo_id: i64,
    pub tag_name: String,
    pub lower_tag_name: String,
    pub sha1: String,
    pub num_commits: i64,
    pub created_unix: i64,
    pub is_tag: bool,
    pub is_draft: bool,
    pub title: String,
    pub note: String,
}

/// Values for inserting a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub repo_id: i64,
    pub tag_name: String,
    pub sha1: String,
    pub num_commits: i64,
    pub created_unix: i64,
    pub is_tag: bool,
    pub is_draft: bool,
    pub title: String,
    pub note: String,
}

impl NewRelease {
    /// A release row mirroring a tag.
    pub fn from_tag(repo_id: i64, tag: &crate::models::Tag) -> Self {
        Self {
            repo_id,
            tag_name: tag.name.clone(),
            sha1: tag.object_id.clone(),
            num_commits: NUM_COMMITS_NOT_COMPUTED,
            created_unix: tag.created_unix(),
            is_tag: true,
            is_draft: false,
            title: String::new(),
            note: String::new(),
        }
    }

    pub fn lower_tag_name(&self) -> String {
        self.tag_name.to_lowercase()
    }
}

/// Filter for listing a repository's releases.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindReleasesOptions {
    pub repo_id: i64,
    pub include_drafts: bool,
    pub include_tags: bool,
}

impl FindReleasesOptions {
    /// Every release of the repository, drafts and tag mirrors included.
    pub fn all(repo_id: i64) -> Self {
        Self {
            repo_id,
            include_drafts: true,
            include_tags: true,
        }
    }
}
