use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    LocalRef, StagePut, StagedBlob, StagedBlobInfo, StagingConfig, StagingError, StagingResult,
    StagingStore,
};

/// In-memory staging backend for testing and development
pub struct MemoryStagingStore {
    blobs: Arc<RwLock<HashMap<LocalRef, StagedBlob>>>,
    config: StagingConfig,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::with_config(StagingConfig::default())
    }

    pub fn with_config(config: StagingConfig) -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }
}

impl Default for MemoryStagingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn stage(&self, put: StagePut, payload: Bytes) -> StagingResult<LocalRef> {
        let size = payload.len() as u64;
        if size > self.config.max_payload_bytes {
            return Err(StagingError::PayloadTooLarge {
                size,
                max: self.config.max_payload_bytes,
            });
        }

        let id = LocalRef::generate();
        let blob = StagedBlob {
            id: id.clone(),
            payload,
            content_type: put
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            original_name: put.original_name,
            size_bytes: size,
            created_at: Utc::now(),
        };

        self.blobs.write().insert(id.clone(), blob);
        debug!("Staged blob {} ({} bytes)", id, size);

        Ok(id)
    }

    async fn read(&self, id: &LocalRef) -> StagingResult<Option<StagedBlob>> {
        Ok(self.blobs.read().get(id).cloned())
    }

    async fn remove(&self, id: &LocalRef) -> StagingResult<()> {
        if self.blobs.write().remove(id).is_some() {
            debug!("Removed staged blob {}", id);
        }
        Ok(())
    }

    async fn list_all(&self) -> StagingResult<Vec<StagedBlobInfo>> {
        Ok(self.blobs.read().values().map(StagedBlob::info).collect())
    }

    async fn clear(&self) -> StagingResult<()> {
        self.blobs.write().clear();
        Ok(())
    }

    async fn pending_count(&self) -> StagingResult<usize> {
        Ok(self.blobs.read().len())
    }
}
