//! Backfill of LFS objects a repository references but does not hold.
//!
//! A scanner task streams every pointer found in the repository's history.
//! The consumer loop here skips pointers the repository already tracks,
//! links pointers whose content is already in the shared store, drops those
//! above the size limit, and downloads the rest in batches. For every
//! downloaded object the meta record is written before the content; if the
//! content write fails the meta record is removed again.
//!
//! The pointer channel closing and the scanner's terminal error are separate
//! signals. The loop drains the channel completely and only then checks the
//! error slot, so a scan failure is reported even after a clean drain.

use crate::cancel::CancellationToken;
use crate::config::LfsSettings;
use crate::error::Result;
use crate::git::{spawn_pointer_scan, PointerScanner};
use crate::lfs::{ContentReader, ContentStore, LfsClient, LfsMetaStore, LfsPointer, ObjectCallback};
use crate::models::Repository;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// What one backfill run did with the pointers it saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    /// Pointers received from the scanner.
    pub scanned: usize,
    /// Pointers the repository already had a meta object for.
    pub already_tracked: usize,
    /// Pointers whose content was already stored; only the meta object was created.
    pub linked_existing: usize,
    /// Objects downloaded and stored.
    pub downloaded: usize,
    /// Objects the upstream reported as missing.
    pub missing_upstream: usize,
    /// Objects skipped because they exceed the size limit.
    pub skipped_too_large: usize,
}

/// One backfill run for one repository.
pub struct LfsBackfill<'a> {
    repo: &'a Repository,
    meta: &'a dyn LfsMetaStore,
    content: &'a dyn ContentStore,
    client: &'a dyn LfsClient,
    settings: &'a LfsSettings,
    cancel: CancellationToken,
}

impl<'a> LfsBackfill<'a> {
    pub fn new(
        repo: &'a Repository,
        meta: &'a dyn LfsMetaStore,
        content: &'a dyn ContentStore,
        client: &'a dyn LfsClient,
        settings: &'a LfsSettings,
    ) -> Self {
        Self {
            repo,
            meta,
            content,
            client,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` for the scanner and the downloads.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scan the repository with `scanner` and store every missing object.
    pub async fn run(&self, scanner: Arc<dyn PointerScanner>) -> Result<BackfillSummary> {
        let repo = self.repo;
        let mut scan = spawn_pointer_scan(
            scanner,
            self.cancel.clone(),
            self.settings.scan_channel_capacity,
        );

        let batch_size = self.client.batch_size().max(1);
        let mut summary = BackfillSummary::default();
        let mut batch: Vec<LfsPointer> = Vec::with_capacity(batch_size);
        let mut queued: HashSet<String> = HashSet::new();

        while let Some(blob) = scan.pointers.recv().await {
            if self.cancel.is_cancelled() {
                debug!("{}: LFS backfill cancelled, leaving remaining pointers", repo);
                break;
            }
            summary.scanned += 1;
            let pointer = blob.pointer;

            if queued.contains(&pointer.oid) {
                trace!("{}: LFS object {} already queued", repo, pointer);
                continue;
            }

            let meta = self
                .meta
                .get_meta_object(repo.id, &pointer.oid)
                .map_err(|e| {
                    error!("{}: Error querying LFS meta object {}: {}", repo, pointer, e);
                    e
                })?;
            if meta.is_some() {
                trace!("{}: Skipping known LFS meta object {}", repo, pointer);
                summary.already_tracked += 1;
                continue;
            }

            trace!("{}: LFS object {} not present in repository", repo, pointer);

            let exists = self.content.exists(&pointer).await.map_err(|e| {
                error!("{}: Error checking if LFS object {} exists: {}", repo, pointer, e);
                e
            })?;

            if exists {
                trace!("{}: LFS object {} already present; creating meta object", repo, pointer);
                self.meta.new_meta_object(repo.id, &pointer).map_err(|e| {
                    error!("{}: Error creating LFS meta object {}: {}", repo, pointer, e);
                    e
                })?;
                summary.linked_existing += 1;
                continue;
            }

            if self.settings.exceeds_max_file_size(pointer.size) {
                info!(
                    "{}: LFS object {} download denied because of max_file_size={} < size {}",
                    repo, pointer, self.settings.max_file_size, pointer.size
                );
                summary.skipped_too_large += 1;
                continue;
            }

            queued.insert(pointer.oid.clone());
            batch.push(pointer);
            if batch.len() >= batch_size {
                self.download_objects(&batch, &mut summary).await?;
                batch.clear();
            }
        }

        if !batch.is_empty() && !self.cancel.is_cancelled() {
            self.download_objects(&batch, &mut summary).await?;
        }

        if let Err(e) = scan.finish().await {
            error!("{}: Error enumerating LFS objects for repository: {}", repo, e);
            return Err(e);
        }

        info!(
            "{}: LFS backfill done: {} scanned, {} downloaded, {} linked, {} already tracked, {} missing upstream, {} too large",
            repo,
            summary.scanned,
            summary.downloaded,
            summary.linked_existing,
            summary.already_tracked,
            summary.missing_upstream,
            summary.skipped_too_large
        );
        Ok(summary)
    }

    /// Download one batch and persist each object as it arrives.
    ///
    /// A failure of the batch after cancellation was requested counts as a
    /// clean stop.
    async fn download_objects(
        &self,
        pointers: &[LfsPointer],
        summary: &mut BackfillSummary,
    ) -> Result<()> {
        debug!("{}: Downloading batch of {} LFS objects", self.repo, pointers.len());
        let mut persist = PersistObjects {
            backfill: self,
            summary,
        };
        match self.client.download(&self.cancel, pointers, &mut persist).await {
            Err(e) if self.cancel.is_cancelled() => {
                debug!("{}: LFS download stopped by cancellation: {}", self.repo, e);
                Ok(())
            }
            result => result,
        }
    }
}

/// Per-object callback storing downloaded content.
struct PersistObjects<'a, 'b> {
    backfill: &'b LfsBackfill<'a>,
    summary: &'b mut BackfillSummary,
}

#[async_trait]
impl<'a, 'b> ObjectCallback for PersistObjects<'a, 'b> {
    async fn on_object(
        &mut self,
        pointer: &LfsPointer,
        content: Result<ContentReader>,
    ) -> Result<()> {
        let repo = self.backfill.repo;
        let content = match content {
            Ok(content) => content,
            Err(e) if e.is_object_not_exist() => {
                warn!("Ignoring missing upstream LFS object {}: {}", pointer, e);
                self.summary.missing_upstream += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.backfill
            .meta
            .new_meta_object(repo.id, pointer)
            .map_err(|e| {
                error!("{}: Error creating LFS meta object {}: {}", repo, pointer, e);
                e
            })?;

        if let Err(e) = self.backfill.content.put(pointer, content).await {
            error!("{}: Error storing content for LFS meta object {}: {}", repo, pointer, e);
            if let Err(e2) = self.backfill.meta.remove_meta_object_by_oid(repo.id, &pointer.oid) {
                error!("{}: Error removing LFS meta object {}: {}", repo, pointer, e2);
            }
            return Err(e);
        }

        self.summary.downloaded += 1;
        Ok(())
    }
}
