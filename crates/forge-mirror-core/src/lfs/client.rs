//! Upstream LFS clients.
//!
//! A client downloads a batch of objects and hands each one, or the error
//! for it, to an [`ObjectCallback`]. The callback decides whether a
//! per-object error aborts the batch.

use crate::cancel::CancellationToken;
use crate::config::LfsConfig;
use crate::error::Result;
use crate::lfs::content_store::{ContentReader, FsContentStore};
use crate::lfs::pointer::LfsPointer;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::trace;

/// Receives the outcome of each object in a download batch.
#[async_trait]
pub trait ObjectCallback: Send {
    /// Handle one object. Returning an error aborts the rest of the batch.
    async fn on_object(&mut self, pointer: &LfsPointer, content: Result<ContentReader>)
        -> Result<()>;
}

/// A source of LFS object content.
#[async_trait]
pub trait LfsClient: Send + Sync {
    /// Preferred number of pointers per `download` call.
    fn batch_size(&self) -> usize;

    /// Download `pointers`, invoking `callback` once per object.
    ///
    /// Returns the first error the callback returned, or a failure of the
    /// batch as a whole.
    async fn download(
        &self,
        cancel: &CancellationToken,
        pointers: &[LfsPointer],
        callback: &mut dyn ObjectCallback,
    ) -> Result<()>;
}

/// Client for an upstream that is another content store on disk.
///
/// Used when the mirror's LFS endpoint is a local path.
#[derive(Debug, Clone)]
pub struct FilesystemClient {
    upstream: FsContentStore,
    batch_size: usize,
}

impl FilesystemClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            upstream: FsContentStore::new(root),
            batch_size: LfsConfig::DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[async_trait]
impl LfsClient for FilesystemClient {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn download(
        &self,
        cancel: &CancellationToken,
        pointers: &[LfsPointer],
        callback: &mut dyn ObjectCallback,
    ) -> Result<()> {
        for pointer in pointers {
            cancel.check()?;
            trace!(
                "Reading LFS object {} from {}",
                pointer,
                self.upstream.root().display()
            );
            let content = self.upstream.get(pointer).await;
            callback.on_object(pointer, content).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirrorError;
    use crate::lfs::content_store::{pointer_for_bytes, ContentStore};
    use std::io::Cursor;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[derive(Default)]
    struct Collect {
        found: Vec<(String, Vec<u8>)>,
        missing: Vec<String>,
    }

    #[async_trait]
    impl ObjectCallback for Collect {
        async fn on_object(
            &mut self,
            pointer: &LfsPointer,
            content: Result<ContentReader>,
        ) -> Result<()> {
            match content {
                Ok(mut reader) => {
                    let mut data = Vec::new();
                    reader.read_to_end(&mut data).await?;
                    self.found.push((pointer.oid.clone(), data));
                }
                Err(e) if e.is_object_not_exist() => self.missing.push(pointer.oid.clone()),
                Err(e) => return Err(e),
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_download_reports_found_and_missing() {
        let temp = TempDir::new().unwrap();
        let upstream = FsContentStore::new(temp.path());
        let present = pointer_for_bytes(b"present");
        upstream
            .put(&present, Box::new(Cursor::new(b"present".to_vec())))
            .await
            .unwrap();
        let absent = pointer_for_bytes(b"absent");

        let client = FilesystemClient::new(temp.path());
        let mut collect = Collect::default();
        client
            .download(
                &CancellationToken::new(),
                &[present.clone(), absent.clone()],
                &mut collect,
            )
            .await
            .unwrap();

        assert_eq!(collect.found, vec![(present.oid, b"present".to_vec())]);
        assert_eq!(collect.missing, vec![absent.oid]);
    }

    #[tokio::test]
    async fn test_download_stops_when_cancelled() {
        let temp = TempDir::new().unwrap();
        let client = FilesystemClient::new(temp.path()).with_batch_size(0);
        assert_eq!(client.batch_size(), 1);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut collect = Collect::default();
        let err = client
            .download(&cancel, &[pointer_for_bytes(b"x")], &mut collect)
            .await
            .unwrap_err();
        assert!(matches!(err, MirrorError::Cancelled));
        assert!(collect.missing.is_empty());
    }
}
