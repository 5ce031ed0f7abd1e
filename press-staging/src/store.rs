use async_trait::async_trait;
use bytes::Bytes;

use crate::{LocalRef, StagePut, StagedBlob, StagedBlobInfo, StagingResult};

/// Core staging operations - must be implemented by all staging backends
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Persist a payload and return a fresh local reference.
    ///
    /// Never fails silently: on persistence failure the error surfaces to the
    /// caller, and the caller must not assume the attach succeeded.
    async fn stage(&self, put: StagePut, payload: Bytes) -> StagingResult<LocalRef>;

    /// Read a staged blob.
    ///
    /// Unknown ids return `Ok(None)` - the blob may have been cleaned up by a
    /// previous synchronization run, which is not an error.
    async fn read(&self, id: &LocalRef) -> StagingResult<Option<StagedBlob>>;

    /// Remove a staged blob. Idempotent: removing an unknown id is a no-op.
    async fn remove(&self, id: &LocalRef) -> StagingResult<()>;

    /// List metadata for every staged blob (housekeeping/diagnostics only)
    async fn list_all(&self) -> StagingResult<Vec<StagedBlobInfo>>;

    /// Remove every staged blob
    async fn clear(&self) -> StagingResult<()>;

    /// Number of blobs still awaiting upload
    async fn pending_count(&self) -> StagingResult<usize> {
        Ok(self.list_all().await?.len())
    }
}
