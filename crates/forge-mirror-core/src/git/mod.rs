//! Version-control collaborators: tag listing and LFS pointer discovery.
//!
//! [`spawn_pointer_scan`] runs a [`PointerScanner`] on its own task and
//! exposes two independent signals: a bounded pointer channel that closes
//! when the scan ends, and a one-slot error channel carrying the terminal
//! scan error, if any. Consumers must drain the first and then check the
//! second; [`PointerScan::finish`] does the second half.

mod repository;

pub use repository::GitRepository;

use crate::cancel::CancellationToken;
use crate::error::{MirrorError, Result};
use crate::lfs::PointerBlob;
use crate::models::Tag;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

/// Lists a repository's tags.
#[async_trait]
pub trait TagSource: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<Tag>>;
}

/// Walks a repository's history and emits every distinct LFS pointer blob.
#[async_trait]
pub trait PointerScanner: Send + Sync {
    /// Send each pointer blob on `tx`. A closed `tx` means the consumer is
    /// gone and the scan should stop without error.
    async fn scan(&self, cancel: &CancellationToken, tx: mpsc::Sender<PointerBlob>) -> Result<()>;
}

/// Handles to a running pointer scan.
pub struct PointerScan {
    pub pointers: mpsc::Receiver<PointerBlob>,
    error: oneshot::Receiver<MirrorError>,
    handle: JoinHandle<()>,
}

impl PointerScan {
    /// Wait for the scan task and return its terminal error.
    ///
    /// Call after `pointers` has returned `None`.
    pub async fn finish(self) -> Result<()> {
        match self.error.await {
            Ok(err) => Err(err),
            Err(_) => match self.handle.await {
                Ok(()) => Ok(()),
                Err(e) => Err(MirrorError::Scan {
                    message: format!("scanner task failed: {}", e),
                }),
            },
        }
    }
}

/// Start `scanner` on a background task.
///
/// Once `cancel` fires the scan is dropped; the cancellation itself is not
/// reported through the error slot.
pub fn spawn_pointer_scan(
    scanner: Arc<dyn PointerScanner>,
    cancel: CancellationToken,
    capacity: usize,
) -> PointerScan {
    let (tx, pointers) = mpsc::channel(capacity.max(1));
    let (error_tx, error) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let result = tokio::select! {
            result = scanner.scan(&cancel, tx) => result,
            _ = cancel.cancelled() => Ok(()),
        };
        match result {
            Ok(()) => {}
            Err(e) if cancel.is_cancelled() => {
                warn!("Pointer scan failed after cancellation, not reporting: {}", e);
            }
            Err(e) => {
                let _ = error_tx.send(e);
            }
        }
    });

    PointerScan {
        pointers,
        error,
        handle,
    }
}
