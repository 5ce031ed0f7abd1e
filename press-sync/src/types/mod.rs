mod document;
mod events;
mod ids;

pub use document::{
    ContentKind, Document, MediaEntry, MediaField, MediaKind, MediaList, MediaRef, Node, RichText,
    VideoField, VideoMetadata, VideoSource,
};
pub use events::{SyncEvent, SyncProgress, SyncState};
pub use ids::{DocumentId, JobId};
