use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{DocumentId, JobId, SyncResult, VideoMetadata};

/// Destination profile at the remote upload endpoint.
///
/// Images and videos land in differently-configured destinations (size and
/// codec constraints differ); enforcement of size ceilings happens before
/// the orchestrator is invoked, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadProfile {
    Image,
    Video,
}

/// External collaborator: the object-storage/CDN upload endpoint.
///
/// Accepts a payload plus a destination folder and returns a permanent URL.
/// Retries and timeouts belong to implementations of this trait; the
/// orchestrator assumes each call either resolves with a URL or rejects.
#[async_trait]
pub trait RemoteUploader: Send + Sync {
    async fn upload(
        &self,
        payload: Bytes,
        folder: &str,
        filename: &str,
        profile: UploadProfile,
    ) -> SyncResult<String>;
}

/// External collaborator: the asynchronous video encoding/publishing queue.
///
/// Long-form video is handed off here instead of being uploaded
/// synchronously; resolution of the returned job id into a final playable
/// URL happens out of band.
#[async_trait]
pub trait VideoJobQueue: Send + Sync {
    async fn submit(
        &self,
        payload: Bytes,
        metadata: &VideoMetadata,
        parent: &DocumentId,
    ) -> SyncResult<JobId>;
}

/// Versioned placeholder written into a video field after a job-queue
/// hand-off, until the out-of-band resolver overwrites it with the final URL.
///
/// Wire format (v1): `<embed-base>/pending_<job_id>`. Both sides of the
/// contract parse and render through this type so the format cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPlaceholder {
    pub job_id: JobId,
}

impl PendingPlaceholder {
    pub const SEGMENT_PREFIX: &'static str = "pending_";

    pub fn new(job_id: JobId) -> Self {
        Self { job_id }
    }

    /// Render the placeholder URL under the configured embed base
    pub fn render(&self, embed_base: &str) -> String {
        format!(
            "{}/{}{}",
            embed_base.trim_end_matches('/'),
            Self::SEGMENT_PREFIX,
            self.job_id
        )
    }

    /// Parse a placeholder back out of a URL, if it is one
    pub fn parse(url: &str) -> Option<Self> {
        let last = url.rsplit('/').next()?;
        let job_id = last.strip_prefix(Self::SEGMENT_PREFIX)?;
        if job_id.is_empty() {
            return None;
        }
        Some(Self {
            job_id: JobId::from(job_id),
        })
    }
}
