//! Content-addressed storage for LFS object bytes.
//!
//! Objects are shared by every repository and keyed only by oid. Writes go
//! to a temp file first and are renamed into place once the sha256 and size
//! match the pointer, so two writers racing on the same oid both leave the
//! same bytes behind.

use crate::config::LfsConfig;
use crate::error::{MirrorError, Result};
use crate::lfs::pointer::LfsPointer;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

/// Streamed object content.
pub type ContentReader = Box<dyn AsyncRead + Send + Unpin>;

/// Storage for LFS object bytes.
///
/// There is no ordering between `exists` and a later `put`; implementations
/// must accept a redundant `put` of content that is already stored.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Whether content for the pointer's oid is stored.
    async fn exists(&self, pointer: &LfsPointer) -> Result<bool>;

    /// Store the content for `pointer`, reading `content` to the end.
    async fn put(&self, pointer: &LfsPointer, content: ContentReader) -> Result<()>;
}

/// Filesystem content store rooted at a directory.
///
/// Layout: `<root>/aa/bb/<rest of oid>`, temp files under `<root>/tmp`.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path where the pointer's content lives.
    pub fn object_path(&self, pointer: &LfsPointer) -> PathBuf {
        self.root.join(pointer.relative_path())
    }

    /// Open stored content for reading.
    pub async fn get(&self, pointer: &LfsPointer) -> Result<ContentReader> {
        let path = self.object_path(pointer);
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(MirrorError::ObjectNotExist {
                oid: pointer.oid.clone(),
            }),
            Err(e) => Err(MirrorError::io_with_path(e, path)),
        }
    }

    fn temp_dir(&self) -> PathBuf {
        self.root.join(LfsConfig::CONTENT_TEMP_DIR_NAME)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn exists(&self, pointer: &LfsPointer) -> Result<bool> {
        let path = self.object_path(pointer);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MirrorError::io_with_path(e, path)),
        }
    }

    async fn put(&self, pointer: &LfsPointer, mut content: ContentReader) -> Result<()> {
        if !pointer.is_valid() {
            return Err(MirrorError::InvalidPointer {
                message: format!("refusing to store {}", pointer),
            });
        }

        let temp_dir = self.temp_dir();
        tokio::fs::create_dir_all(&temp_dir)
            .await
            .map_err(|e| MirrorError::io_with_path(e, &temp_dir))?;

        let temp = tempfile::Builder::new()
            .prefix(&pointer.oid)
            .suffix(".part")
            .tempfile_in(&temp_dir)
            .map_err(|e| MirrorError::io_with_path(e, &temp_dir))?;
        let temp_path = temp.path().to_path_buf();
        let mut file = tokio::fs::File::from_std(
            temp.reopen()
                .map_err(|e| MirrorError::io_with_path(e, &temp_path))?,
        );

        let mut hasher = Sha256::new();
        let mut written: i64 = 0;
        let mut buffer = vec![0u8; LfsConfig::COPY_CHUNK_SIZE];
        loop {
            let n = content.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            written += n as i64;
            if written > pointer.size {
                return Err(MirrorError::SizeMismatch {
                    oid: pointer.oid.clone(),
                    expected: pointer.size,
                    actual: written,
                });
            }
            hasher.update(&buffer[..n]);
            file.write_all(&buffer[..n])
                .await
                .map_err(|e| MirrorError::io_with_path(e, &temp_path))?;
        }
        file.flush()
            .await
            .map_err(|e| MirrorError::io_with_path(e, &temp_path))?;
        file.sync_all()
            .await
            .map_err(|e| MirrorError::io_with_path(e, &temp_path))?;
        drop(file);

        if written != pointer.size {
            return Err(MirrorError::SizeMismatch {
                oid: pointer.oid.clone(),
                expected: pointer.size,
                actual: written,
            });
        }
        let actual = hex::encode(hasher.finalize());
        if actual != pointer.oid {
            return Err(MirrorError::HashMismatch {
                expected: pointer.oid.clone(),
                actual,
            });
        }

        let final_path = self.object_path(pointer);
        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MirrorError::io_with_path(e, parent))?;
        }
        temp.persist(&final_path)
            .map_err(|e| MirrorError::io_with_path(e.error, &final_path))?;

        trace!("Stored LFS object {} at {}", pointer, final_path.display());
        debug!("Stored {} bytes for LFS object {}", written, pointer.oid);
        Ok(())
    }
}

/// Hash `data` the way the content store keys it.
pub fn pointer_for_bytes(data: &[u8]) -> LfsPointer {
    LfsPointer::new(hex::encode(Sha256::digest(data)), data.len() as i64)
}
