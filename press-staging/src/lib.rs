//! # press-staging: local-first media staging store
//!
//! `press-staging` holds binary media that an author attached while editing
//! but that has not been uploaded to the CDN yet. Each staged payload gets an
//! opaque [`LocalRef`] token that can stand in anywhere a media field expects
//! a URL; the synchronization pipeline later reads the payload back, uploads
//! it, and removes the staged copy.
//!
//! ## Key properties
//!
//! - **Never fails silently**: staging a payload either returns a fresh
//!   [`LocalRef`] or surfaces a [`StagingError`] to the caller.
//! - **Tolerant reads**: reading an unknown id returns `Ok(None)`, because a
//!   document may be resynchronized more than once per session and the blob
//!   may already be gone.
//! - **Idempotent removal**: removing an unknown id is a no-op.
//! - **Backend agnostic**: the [`StagingStore`] trait has an in-memory
//!   backend for tests and a durable filesystem backend for real sessions.
//!
//! ## Quick start
//!
//! ```rust
//! use press_staging::prelude::*;
//! use bytes::Bytes;
//!
//! # #[tokio::main]
//! # async fn main() -> StagingResult<()> {
//! let store = MemoryStagingStore::new();
//!
//! let put = StagePut::new()
//!     .with_content_type("image/png")
//!     .with_original_name("banner.png");
//! let local_ref = store.stage(put, Bytes::from_static(b"...png bytes...")).await?;
//!
//! let staged = store.read(&local_ref).await?.expect("just staged");
//! assert_eq!(staged.content_type, "image/png");
//!
//! store.remove(&local_ref).await?;
//! assert!(store.read(&local_ref).await?.is_none());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod fs;
mod memory;
pub mod store;
mod types;

pub use config::StagingConfig;
pub use error::{StagingError, StagingResult};
pub use fs::FsStagingStore;
pub use memory::MemoryStagingStore;
pub use store::StagingStore;
pub use types::{LocalRef, StagePut, StagedBlob, StagedBlobInfo};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        LocalRef, MemoryStagingStore, StagePut, StagedBlob, StagingError, StagingResult,
        StagingStore,
    };
}
