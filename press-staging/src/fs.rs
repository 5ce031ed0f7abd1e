use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    LocalRef, StagePut, StagedBlob, StagedBlobInfo, StagingConfig, StagingError, StagingResult,
    StagingStore,
};

/// On-disk layout version; bump when the record shape changes
const LAYOUT_VERSION: &str = "v1";

/// Durable filesystem staging backend.
///
/// Each staged blob is one payload file plus a JSON metadata sidecar under
/// `<root>/<version>/`, keyed by the local reference string. The metadata
/// sidecar is written last so a partially written payload is never visible
/// as a complete record.
pub struct FsStagingStore {
    dir: PathBuf,
    config: StagingConfig,
}

impl FsStagingStore {
    /// Open (or create) a staging directory
    pub async fn open(config: StagingConfig) -> StagingResult<Self> {
        let dir = config.root_dir.join(LAYOUT_VERSION);
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, config })
    }

    fn payload_path(&self, id: &LocalRef) -> PathBuf {
        self.dir.join(format!("{}.bin", id.as_str()))
    }

    fn meta_path(&self, id: &LocalRef) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }

    async fn remove_if_present(path: &PathBuf) -> StagingResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StagingStore for FsStagingStore {
    async fn stage(&self, put: StagePut, payload: Bytes) -> StagingResult<LocalRef> {
        let size = payload.len() as u64;
        if size > self.config.max_payload_bytes {
            return Err(StagingError::PayloadTooLarge {
                size,
                max: self.config.max_payload_bytes,
            });
        }

        let id = LocalRef::generate();
        let info = StagedBlobInfo {
            id: id.clone(),
            content_type: put
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            original_name: put.original_name,
            size_bytes: size,
            created_at: Utc::now(),
        };

        // Payload first, sidecar last
        fs::write(self.payload_path(&id), &payload).await?;
        fs::write(self.meta_path(&id), serde_json::to_vec(&info)?).await?;

        debug!("Staged blob {} on disk ({} bytes)", id, size);
        Ok(id)
    }

    async fn read(&self, id: &LocalRef) -> StagingResult<Option<StagedBlob>> {
        let meta_bytes = match fs::read(self.meta_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let info: StagedBlobInfo = serde_json::from_slice(&meta_bytes)?;

        // Sidecar exists, so a missing payload is corruption, not absence
        let payload = match fs::read(self.payload_path(id)).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                return Err(StagingError::corrupt(
                    id.as_str(),
                    format!("payload unreadable: {}", e),
                ))
            }
        };

        Ok(Some(StagedBlob {
            id: info.id,
            payload,
            content_type: info.content_type,
            original_name: info.original_name,
            size_bytes: info.size_bytes,
            created_at: info.created_at,
        }))
    }

    async fn remove(&self, id: &LocalRef) -> StagingResult<()> {
        Self::remove_if_present(&self.meta_path(id)).await?;
        Self::remove_if_present(&self.payload_path(id)).await?;
        Ok(())
    }

    async fn list_all(&self) -> StagingResult<Vec<StagedBlobInfo>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut infos = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<StagedBlobInfo>(&bytes) {
                Ok(info) => infos.push(info),
                Err(e) => warn!("Skipping unreadable staging sidecar {:?}: {}", path, e),
            }
        }

        Ok(infos)
    }

    async fn clear(&self) -> StagingResult<()> {
        fs::remove_dir_all(&self.dir).await?;
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }
}
