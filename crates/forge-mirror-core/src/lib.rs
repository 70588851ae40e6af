//! Forge Mirror - repository mirroring maintenance for a self-hosted git forge.
//!
//! Two jobs run after a pull mirror has fetched from its upstream:
//!
//! - [`sync_releases_with_tags`] makes the tag-mirrored release rows of a
//!   repository identical to its git tags, in one transaction.
//! - [`LfsBackfill`] walks the repository history for LFS pointers and
//!   downloads every referenced object the forge does not hold yet.
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_mirror::{sync_repo_tags, Database};
//!
//! #[tokio::main]
//! async fn main() -> forge_mirror::Result<()> {
//!     let db = Database::open("/srv/forge/mirror.db")?;
//!     let summary = sync_repo_tags(&db, 42).await?;
//!     println!("{} added, {} deleted, {} updated", summary.added, summary.deleted, summary.updated);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod db;
pub mod error;
pub mod git;
pub mod lfs;
pub mod lfs_backfill;
pub mod models;
pub mod release_sync;
pub mod wiki;

// Re-export commonly used types
pub use cancel::{CancellationToken, CancelledError};
pub use config::{LfsSettings, MirrorConfig};
pub use db::Database;
pub use error::{MirrorError, Result};
pub use git::{spawn_pointer_scan, GitRepository, PointerScan, PointerScanner, TagSource};
pub use lfs::{
    ContentReader, ContentStore, FilesystemClient, FsContentStore, LfsClient, LfsMetaObject,
    LfsMetaStore, LfsPointer, ObjectCallback, PointerBlob,
};
pub use lfs_backfill::{BackfillSummary, LfsBackfill};
pub use models::{
    FindReleasesOptions, NewRelease, NewRepository, ReleaseRecord, Repository, Tag,
    NUM_COMMITS_NOT_COMPUTED,
};
pub use release_sync::{calc_sync, sync_releases_with_tags, sync_repo_tags, SyncPlan, SyncSummary};
pub use wiki::{wiki_remote_url, GitRemoteProber, HttpRemoteProber, RemoteProber};
