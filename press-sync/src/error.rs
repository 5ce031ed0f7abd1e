use press_staging::StagingError;
use thiserror::Error;

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a synchronization run.
///
/// `UploadRejected` and `JobQueueSubmission` messages are surfaced to users
/// verbatim by callers, so they must stay human-readable and actionable.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Could not read staged file {reference}: {source}")]
    StorageRead {
        reference: String,
        #[source]
        source: StagingError,
    },

    #[error("Upload rejected for {reference}: {reason}")]
    UploadRejected { reference: String, reason: String },

    #[error("Video job submission failed for {reference}: {reason}")]
    JobQueueSubmission { reference: String, reason: String },

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Create a storage read error
    pub fn storage_read<R: Into<String>>(reference: R, source: StagingError) -> Self {
        Self::StorageRead {
            reference: reference.into(),
            source,
        }
    }

    /// Create an upload rejection error
    pub fn upload_rejected<R: Into<String>, M: Into<String>>(reference: R, reason: M) -> Self {
        Self::UploadRejected {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Create a job queue submission error
    pub fn job_submission<R: Into<String>, M: Into<String>>(reference: R, reason: M) -> Self {
        Self::JobQueueSubmission {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}
