//! # press-resolve: renderable URLs for staged media
//!
//! While an author edits, media fields hold either remote URLs or local
//! staging tokens ([`LocalRef`]). The editor UI needs a single function that
//! turns whatever is in a field into something renderable *right now*:
//!
//! - empty/`None` -> empty string
//! - any remote reference -> returned unchanged
//! - a local reference -> a session-scoped preview handle, loaded lazily
//!   from the staging store and memoized for the lifetime of the session
//!
//! The resolver never mutates the staging store; it only creates ephemeral
//! in-memory handles that are released when the [`PreviewSession`] ends.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, warn};

use press_staging::{LocalRef, StagingStore};

/// Ephemeral in-memory handle for a staged blob.
///
/// The synthetic `preview://` URL is only meaningful within the editing
/// session that created it; the bytes back whatever the UI renders.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    pub url: String,
    pub payload: Bytes,
    pub content_type: String,
}

enum HandleState {
    Loading,
    Ready(PreviewHandle),
    Missing,
}

type RefreshFn = Arc<dyn Fn() + Send + Sync>;

/// Session-scoped cache of preview handles over a staging store.
///
/// One `PreviewSession` per editing session; call [`release_all`] (or drop
/// the session) when editing ends so handles do not outlive their use.
///
/// [`release_all`]: PreviewSession::release_all
pub struct PreviewSession {
    store: Arc<dyn StagingStore>,
    handles: Arc<RwLock<HashMap<LocalRef, HandleState>>>,
    on_refresh: Arc<RwLock<Option<RefreshFn>>>,
}

impl PreviewSession {
    pub fn new(store: Arc<dyn StagingStore>) -> Self {
        Self {
            store,
            handles: Arc::new(RwLock::new(HashMap::new())),
            on_refresh: Arc::new(RwLock::new(None)),
        }
    }

    /// Register a callback fired when a background load finishes, so the UI
    /// can re-render and pick up the now-ready handle.
    pub fn on_refresh<F: Fn() + Send + Sync + 'static>(&self, callback: F) {
        *self.on_refresh.write() = Some(Arc::new(callback));
    }

    /// Map any media reference to a renderable URL.
    ///
    /// Local references resolve to a cached preview handle; until the handle
    /// has loaded this returns an empty string and a background load runs,
    /// firing the refresh callback on completion.
    pub fn resolve(&self, reference: Option<&str>) -> String {
        let reference = match reference {
            Some(r) if !r.is_empty() => r,
            _ => return String::new(),
        };

        let local = match LocalRef::parse(reference) {
            Some(local) => local,
            // Any non-local scheme passes through untouched
            None => return reference.to_string(),
        };

        {
            let handles = self.handles.read();
            match handles.get(&local) {
                Some(HandleState::Ready(handle)) => return handle.url.clone(),
                Some(HandleState::Loading) | Some(HandleState::Missing) => return String::new(),
                None => {}
            }
        }

        self.spawn_load(local);
        String::new()
    }

    /// Get the loaded handle for a local reference, if ready
    pub fn handle(&self, id: &LocalRef) -> Option<PreviewHandle> {
        match self.handles.read().get(id) {
            Some(HandleState::Ready(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Release every handle held by this session
    pub fn release_all(&self) {
        self.handles.write().clear();
    }

    fn spawn_load(&self, id: LocalRef) {
        self.handles.write().insert(id.clone(), HandleState::Loading);

        let store = self.store.clone();
        let handles = self.handles.clone();
        let on_refresh = self.on_refresh.clone();

        tokio::spawn(async move {
            let state = match store.read(&id).await {
                Ok(Some(blob)) => {
                    debug!("Preview handle ready for {}", id);
                    HandleState::Ready(PreviewHandle {
                        url: format!("preview://{}", id),
                        payload: blob.payload,
                        content_type: blob.content_type,
                    })
                }
                Ok(None) => {
                    warn!("No staged blob for {}, preview stays empty", id);
                    HandleState::Missing
                }
                Err(e) => {
                    warn!("Failed to load preview for {}: {}", id, e);
                    HandleState::Missing
                }
            };

            handles.write().insert(id, state);

            let callback = on_refresh.read().clone();
            if let Some(callback) = callback {
                callback();
            }
        });
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use press_staging::{MemoryStagingStore, StagePut};
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn staged_image(store: &MemoryStagingStore) -> LocalRef {
        store
            .stage(
                StagePut::new().with_content_type("image/png"),
                Bytes::from_static(b"png bytes"),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn empty_and_remote_references_pass_through() {
        let session = PreviewSession::new(Arc::new(MemoryStagingStore::new()));

        assert_eq!(session.resolve(None), "");
        assert_eq!(session.resolve(Some("")), "");
        assert_eq!(
            session.resolve(Some("https://cdn.example.com/x.jpg")),
            "https://cdn.example.com/x.jpg"
        );
    }

    #[tokio::test]
    async fn local_reference_loads_in_background() {
        let store = Arc::new(MemoryStagingStore::new());
        let id = staged_image(&store).await;
        let session = PreviewSession::new(store);

        let (tx, mut rx) = mpsc::unbounded_channel();
        session.on_refresh(move || {
            let _ = tx.send(());
        });

        // First resolve kicks off the load and returns empty
        assert_eq!(session.resolve(Some(id.as_str())), "");

        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("refresh callback fired")
            .unwrap();

        let url = session.resolve(Some(id.as_str()));
        assert_eq!(url, format!("preview://{}", id));

        let handle = session.handle(&id).unwrap();
        assert_eq!(handle.content_type, "image/png");
        assert_eq!(handle.payload, Bytes::from_static(b"png bytes"));
    }

    #[tokio::test]
    async fn missing_blob_resolves_to_empty() {
        let session = PreviewSession::new(Arc::new(MemoryStagingStore::new()));
        let ghost = LocalRef::generate();

        let (tx, mut rx) = mpsc::unbounded_channel();
        session.on_refresh(move || {
            let _ = tx.send(());
        });

        assert_eq!(session.resolve(Some(ghost.as_str())), "");
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("refresh callback fired")
            .unwrap();

        // Still empty: there is nothing to preview
        assert_eq!(session.resolve(Some(ghost.as_str())), "");
        assert!(session.handle(&ghost).is_none());
    }

    #[tokio::test]
    async fn release_all_drops_handles() {
        let store = Arc::new(MemoryStagingStore::new());
        let id = staged_image(&store).await;
        let session = PreviewSession::new(store);

        let (tx, mut rx) = mpsc::unbounded_channel();
        session.on_refresh(move || {
            let _ = tx.send(());
        });
        session.resolve(Some(id.as_str()));
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("refresh callback fired")
            .unwrap();
        assert!(session.handle(&id).is_some());

        session.release_all();
        assert!(session.handle(&id).is_none());
    }
}
