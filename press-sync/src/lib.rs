//! # press-sync: deferred media synchronization pipeline
//!
//! `press-sync` takes a document snapshot full of staged [`press_staging`]
//! references and resolves them against the remote side: every staged image
//! or video is uploaded (or handed to the external video job queue), the
//! document's fields are rewritten to the resulting URLs, and the staged
//! copies are cleaned up. The caller gets back an equivalent document that no
//! longer depends on local state, plus a report of what happened.
//!
//! ## How a run works
//!
//! 1. **Counting**: walk the snapshot and count upload operations. Rich-text
//!    fragments count distinct embedded ids, so the denominator matches the
//!    uploads actually performed.
//! 2. **Uploading**: walk again, node by node. Scalar media and internal
//!    video upload through [`RemoteUploader`]; external video hands off to
//!    [`VideoJobQueue`] and leaves a [`PendingPlaceholder`] URL behind; media
//!    lists and rich-text fragments fan their entries out concurrently.
//!    Every finished asset ticks the aggregate [`SyncProgress`].
//! 3. **Finalizing**: wait out the minimum perceived duration, then emit the
//!    final 100% progress.
//!
//! Re-running a synchronized document is a cheap no-op: nothing is staged, so
//! the run completes immediately at 100%.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use press_sync::prelude::*;
//! use std::sync::Arc;
//!
//! let orchestrator = SyncOrchestrator::new(store, uploader, job_queue)
//!     .with_config(SyncConfig::new())
//!     .with_on_progress(|progress| {
//!         println!("{}% - {}", progress.percent, progress.message);
//!     });
//!
//! let outcome = orchestrator.run(document).await?;
//! assert!(outcome.document.pending_references().is_empty());
//! ```

mod config;
mod error;
pub mod folder;
mod orchestrator;
mod remote;
pub mod richtext;
mod types;

pub use config::{FailureMode, FailurePolicy, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use folder::{DefaultFolderStrategy, FolderStrategy};
pub use orchestrator::{ProgressFn, SyncOrchestrator, SyncOutcome, SyncReport, UnresolvedRef};
pub use remote::{PendingPlaceholder, RemoteUploader, UploadProfile, VideoJobQueue};
pub use types::{
    ContentKind, Document, DocumentId, JobId, MediaEntry, MediaField, MediaKind, MediaList,
    MediaRef, Node, RichText, SyncEvent, SyncProgress, SyncState, VideoField, VideoMetadata,
    VideoSource,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ContentKind, Document, DocumentId, FailureMode, FailurePolicy, JobId, MediaEntry,
        MediaField, MediaKind, MediaList, MediaRef, Node, PendingPlaceholder, RemoteUploader,
        RichText, SyncConfig, SyncError, SyncEvent, SyncOrchestrator, SyncOutcome, SyncProgress,
        SyncReport, SyncResult, UploadProfile, VideoField, VideoJobQueue, VideoMetadata,
        VideoSource,
    };
    pub use press_staging::prelude::*;
}
