use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info, instrument, warn};

use press_staging::{LocalRef, StagingStore};

use crate::{
    folder::{DefaultFolderStrategy, FolderStrategy},
    richtext, Document, DocumentId, FailureMode, JobId, MediaField, MediaKind, MediaList, MediaRef,
    Node, PendingPlaceholder, RemoteUploader, RichText, SyncConfig, SyncError, SyncEvent,
    SyncProgress, SyncResult, UploadProfile, VideoField, VideoJobQueue, VideoSource,
};

/// Callback invoked with every progress update
pub type ProgressFn = Arc<dyn Fn(&SyncProgress) + Send + Sync>;

/// A staged reference the run left unresolved (tolerated failure or missing
/// blob). Callers should surface these as warnings before treating the save
/// as complete.
#[derive(Debug, Clone)]
pub struct UnresolvedRef {
    pub reference: LocalRef,
    pub location: String,
    pub reason: String,
}

/// Summary of one synchronization run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Upload operations discovered by the counting pass
    pub total: usize,
    /// Operations that finished (uploaded, queued, or skipped as missing)
    pub completed: usize,
    /// Jobs handed to the external video queue
    pub queued_jobs: Vec<JobId>,
    /// References left unresolved by tolerated failures
    pub unresolved: Vec<UnresolvedRef>,
}

impl SyncReport {
    /// True when no staged reference was left behind
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Result of a successful run: the resolved snapshot plus its report
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub document: Document,
    pub report: SyncReport,
}

/// Shared state for one run, threaded through the resolution walk
struct RunCx {
    document_id: DocumentId,
    author: String,
    ticks: mpsc::UnboundedSender<String>,
    queued: Mutex<Vec<JobId>>,
    unresolved: Mutex<Vec<UnresolvedRef>>,
}

impl RunCx {
    fn tick<M: Into<String>>(&self, message: M) {
        let _ = self.ticks.send(message.into());
    }

    fn leave_unresolved<M: Into<String>>(&self, reference: &LocalRef, location: &str, reason: M) {
        let reason = reason.into();
        warn!(
            "Leaving {} unresolved at {}: {}",
            reference, location, reason
        );
        self.unresolved.lock().push(UnresolvedRef {
            reference: reference.clone(),
            location: location.to_string(),
            reason,
        });
    }
}

/// Walks a document snapshot, replaces every staged reference with a remote
/// one (or an external-job placeholder), and reports aggregate progress.
///
/// One orchestrator can serve many runs, but a single document must only be
/// synchronized by one caller at a time; preventing concurrent saves of the
/// same document is the caller's job (e.g. disable the save action while a
/// run is in flight).
pub struct SyncOrchestrator {
    store: Arc<dyn StagingStore>,
    uploader: Arc<dyn RemoteUploader>,
    jobs: Arc<dyn VideoJobQueue>,
    folders: Arc<dyn FolderStrategy>,
    config: SyncConfig,
    on_progress: Option<ProgressFn>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncOrchestrator {
    /// Create a new orchestrator with default configuration
    pub fn new(
        store: Arc<dyn StagingStore>,
        uploader: Arc<dyn RemoteUploader>,
        jobs: Arc<dyn VideoJobQueue>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            store,
            uploader,
            jobs,
            folders: Arc::new(DefaultFolderStrategy),
            config: SyncConfig::default(),
            on_progress: None,
            events,
        }
    }

    /// Set the run configuration
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a custom folder strategy
    pub fn with_folder_strategy<F: FolderStrategy + 'static>(mut self, folders: F) -> Self {
        self.folders = Arc::new(folders);
        self
    }

    /// Register a progress callback
    pub fn with_on_progress<F: Fn(&SyncProgress) + Send + Sync + 'static>(
        mut self,
        callback: F,
    ) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Subscribe to the run event stream
    pub fn subscribe(&self) -> BroadcastStream<SyncEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    /// Get the configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronize one document snapshot.
    ///
    /// Returns the equivalent snapshot with every staged reference replaced
    /// by a remote URL or a pending placeholder. On a fatal node failure the
    /// run aborts with the error; earlier fields may already hold remote
    /// URLs, so callers must treat a failure as "retry the whole save".
    #[instrument(skip(self, document), fields(document_id = %document.id, author = %document.author))]
    pub async fn run(&self, mut document: Document) -> SyncResult<SyncOutcome> {
        let started = Instant::now();
        self.emit(SyncEvent::Counting { at: Utc::now() });

        // Phase A: count against the same snapshot Phase B mutates
        let total = document.pending_count();
        info!("Discovered {} staged reference(s)", total);
        self.emit(SyncEvent::Started {
            total,
            at: Utc::now(),
        });

        if total == 0 {
            let progress = SyncProgress::new(0, 0, "Nothing pending.".to_string());
            self.notify(&progress);
            self.emit(SyncEvent::Completed {
                progress,
                at: Utc::now(),
            });
            return Ok(SyncOutcome {
                document,
                report: SyncReport::default(),
            });
        }

        // The aggregator owns the counters; every finished operation pushes
        // exactly one completion message into the channel.
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<String>();
        let events = self.events.clone();
        let on_progress = self.on_progress.clone();
        let aggregator = tokio::spawn(async move {
            let mut completed = 0usize;
            while let Some(message) = tick_rx.recv().await {
                completed += 1;
                let progress = SyncProgress::new(completed, total, message);
                if let Some(callback) = &on_progress {
                    callback(&progress);
                }
                let _ = events.send(SyncEvent::Progress {
                    progress,
                    at: Utc::now(),
                });
            }
            completed
        });

        let cx = RunCx {
            document_id: document.id.clone(),
            author: document.author.clone(),
            ticks: tick_tx,
            queued: Mutex::new(Vec::new()),
            unresolved: Mutex::new(Vec::new()),
        };

        // Phase B: sequential across nodes, fan-out within lists/fragments
        let mut outcome = Ok(());
        for node in &mut document.nodes {
            if let Err(e) = self.resolve_node(node, &cx).await {
                outcome = Err(e);
                break;
            }
        }

        let RunCx {
            ticks,
            queued,
            unresolved,
            ..
        } = cx;
        drop(ticks);
        let completed = aggregator
            .await
            .map_err(|e| SyncError::Internal(format!("progress aggregator: {}", e)))?;

        if let Err(e) = outcome {
            error!("Synchronization aborted: {}", e);
            self.emit(SyncEvent::Failed {
                error: e.to_string(),
                at: Utc::now(),
            });
            return Err(e);
        }

        // UX smoothing floor, not a correctness rule
        self.emit(SyncEvent::Finalizing { at: Utc::now() });
        if let Some(min) = self.config.min_run_duration {
            let elapsed = started.elapsed();
            if elapsed < min {
                tokio::time::sleep(min - elapsed).await;
            }
        }

        let report = SyncReport {
            total,
            completed,
            queued_jobs: queued.into_inner(),
            unresolved: unresolved.into_inner(),
        };
        if !report.is_clean() {
            warn!(
                "Run finished with {} unresolved reference(s)",
                report.unresolved.len()
            );
        }

        let progress = SyncProgress::new(completed, total, "All files synchronized.".to_string());
        self.notify(&progress);
        self.emit(SyncEvent::Completed {
            progress,
            at: Utc::now(),
        });
        info!("Synchronized {}/{} staged reference(s)", completed, total);

        Ok(SyncOutcome { document, report })
    }

    fn resolve_node<'a>(&'a self, node: &'a mut Node, cx: &'a RunCx) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            match node {
                Node::Media(field) => self.resolve_media(field, cx).await,
                Node::MediaList(list) => self.resolve_list(list, cx).await,
                Node::RichText(fragment) => self.resolve_rich_text(fragment, cx).await,
                Node::Video(video) => self.resolve_video(video, cx).await,
                Node::Section { children, .. } => {
                    for child in children {
                        self.resolve_node(child, cx).await?;
                    }
                    Ok(())
                }
            }
        })
    }

    async fn resolve_media(&self, field: &mut MediaField, cx: &RunCx) -> SyncResult<()> {
        let id = match field.value.as_local() {
            Some(id) => id.clone(),
            None => return Ok(()),
        };
        let profile = match field.kind {
            MediaKind::Image => UploadProfile::Image,
            MediaKind::Video => UploadProfile::Video,
        };

        match self.upload_local(&id, &field.label, profile, cx).await {
            Ok(Some(url)) => {
                field.value = MediaRef::Remote(url);
                cx.tick(format!("{} uploaded", field.label));
            }
            Ok(None) => {
                cx.leave_unresolved(&id, &field.label, "staged file not found");
                cx.tick(format!("{} skipped (nothing staged)", field.label));
            }
            Err(e) => return self.handle_failure(self.config.policy.media, e, &id, &field.label, cx),
        }
        Ok(())
    }

    async fn resolve_list(&self, list: &mut MediaList, cx: &RunCx) -> SyncResult<()> {
        let pending: Vec<(usize, LocalRef)> = list
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.url().as_local().map(|id| (index, id.clone())))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        // Entries are independent: fan out, then reassemble positionally
        let label = list.label.clone();
        let uploads = pending.iter().map(|(index, id)| {
            let label = &label;
            async move {
                (
                    *index,
                    id.clone(),
                    self.upload_local(id, label, UploadProfile::Image, cx).await,
                )
            }
        });
        let results = join_all(uploads).await;

        for (index, id, result) in results {
            match result {
                Ok(Some(url)) => {
                    list.entries[index].set_url(MediaRef::Remote(url));
                    cx.tick(format!("{} slot {} uploaded", list.label, index + 1));
                }
                Ok(None) => {
                    cx.leave_unresolved(&id, &list.label, "staged file not found");
                    cx.tick(format!("{} slot {} skipped (nothing staged)", list.label, index + 1));
                }
                Err(e) => {
                    self.handle_failure(self.config.policy.media_list, e, &id, &list.label, cx)?
                }
            }
        }
        Ok(())
    }

    async fn resolve_rich_text(&self, fragment: &mut RichText, cx: &RunCx) -> SyncResult<()> {
        // One upload per distinct id, however many times it is embedded
        let ids = richtext::extract_local_ids(&fragment.html);
        if ids.is_empty() {
            return Ok(());
        }
        let location = format!("rich text block {}", fragment.block_id);

        let uploads = ids.iter().map(|id| async move {
            (
                id.clone(),
                self.upload_local(id, "inline", UploadProfile::Image, cx).await,
            )
        });
        let results = join_all(uploads).await;

        for (id, result) in results {
            match result {
                Ok(Some(url)) => {
                    fragment.html = richtext::substitute(&fragment.html, &id, &url);
                    cx.tick("Inline image uploaded");
                }
                Ok(None) => {
                    cx.leave_unresolved(&id, &location, "staged file not found");
                    cx.tick("Inline image skipped (nothing staged)");
                }
                Err(e) => self.handle_failure(self.config.policy.rich_text, e, &id, &location, cx)?,
            }
        }
        Ok(())
    }

    async fn resolve_video(&self, video: &mut VideoField, cx: &RunCx) -> SyncResult<()> {
        let id = match video.value.as_local() {
            Some(id) => id.clone(),
            None => return Ok(()),
        };

        match video.source.clone() {
            VideoSource::Internal => {
                match self.upload_local(&id, &video.label, UploadProfile::Video, cx).await {
                    Ok(Some(url)) => {
                        video.value = MediaRef::Remote(url);
                        cx.tick(format!("{} uploaded to media host", video.label));
                    }
                    Ok(None) => {
                        cx.leave_unresolved(&id, &video.label, "staged file not found");
                        cx.tick(format!("{} skipped (nothing staged)", video.label));
                    }
                    Err(e) => {
                        return self.handle_failure(self.config.policy.video, e, &id, &video.label, cx)
                    }
                }
            }
            VideoSource::External { metadata } => {
                let blob = match self.store.read(&id).await {
                    Ok(blob) => blob,
                    Err(e) => {
                        return self.handle_failure(
                            self.config.policy.video,
                            SyncError::storage_read(id.as_str(), e),
                            &id,
                            &video.label,
                            cx,
                        )
                    }
                };
                let blob = match blob {
                    Some(blob) => blob,
                    None => {
                        cx.leave_unresolved(&id, &video.label, "staged file not found");
                        cx.tick(format!("{} skipped (nothing staged)", video.label));
                        return Ok(());
                    }
                };

                match self.jobs.submit(blob.payload.clone(), &metadata, &cx.document_id).await {
                    Ok(job_id) => {
                        // The job queue owns the payload from here on
                        self.store.remove(&id).await?;
                        let placeholder = PendingPlaceholder::new(job_id.clone());
                        video.value =
                            MediaRef::Remote(placeholder.render(&self.config.embed_base));
                        info!("Queued {} as external video job {}", id, job_id);
                        cx.queued.lock().push(job_id);
                        cx.tick(format!("{} queued for external publishing", video.label));
                    }
                    Err(e) => {
                        return self.handle_failure(self.config.policy.video, e, &id, &video.label, cx)
                    }
                }
            }
        }
        Ok(())
    }

    /// Read a staged blob, upload it, and clean up the local copy.
    ///
    /// `Ok(None)` means nothing is staged under this id (already synchronized
    /// in an earlier run); the caller leaves the field untouched. The local
    /// copy is deleted only after the remote write is confirmed.
    async fn upload_local(
        &self,
        id: &LocalRef,
        context: &str,
        profile: UploadProfile,
        cx: &RunCx,
    ) -> SyncResult<Option<String>> {
        let blob = self
            .store
            .read(id)
            .await
            .map_err(|e| SyncError::storage_read(id.as_str(), e))?;
        let blob = match blob {
            Some(blob) => blob,
            None => return Ok(None),
        };

        let folder = self.folders.folder(&cx.author, context);
        let filename = format!("{}.{}", id, blob.extension());
        let url = self
            .uploader
            .upload(blob.payload.clone(), &folder, &filename, profile)
            .await?;

        self.store.remove(id).await?;
        debug!("Uploaded {} -> {}", id, url);

        Ok(Some(url))
    }

    fn handle_failure(
        &self,
        mode: FailureMode,
        error: SyncError,
        id: &LocalRef,
        location: &str,
        cx: &RunCx,
    ) -> SyncResult<()> {
        match mode {
            FailureMode::Fatal => {
                error!("Fatal failure at {}: {}", location, error);
                Err(error)
            }
            FailureMode::Tolerate => {
                cx.leave_unresolved(id, location, error.to_string());
                cx.tick(format!("{} failed, continuing", location));
                Ok(())
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    fn notify(&self, progress: &SyncProgress) {
        if let Some(callback) = &self.on_progress {
            callback(progress);
        }
    }
}
