//! Conformance tests for the synchronization pipeline: staged references in,
//! remote references out, staged copies cleaned up, progress accounted for.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio_stream::StreamExt;

use press_staging::{LocalRef, MemoryStagingStore, StagePut, StagingStore};
use press_sync::{
    ContentKind, Document, DocumentId, JobId, MediaEntry, MediaField, MediaKind, MediaList,
    MediaRef, Node, PendingPlaceholder, RemoteUploader, RichText, SyncConfig, SyncError,
    SyncOrchestrator, SyncProgress, SyncResult, UploadProfile, VideoField, VideoJobQueue,
    VideoMetadata, VideoSource,
};

/// Upload endpoint double that records every call and can reject by filename
#[derive(Default)]
struct RecordingUploader {
    uploads: Mutex<Vec<(String, String, UploadProfile)>>,
    reject_containing: Mutex<Option<String>>,
}

impl RecordingUploader {
    fn reject_filenames_containing(&self, needle: &str) {
        *self.reject_containing.lock() = Some(needle.to_string());
    }

    fn recorded(&self) -> Vec<(String, String, UploadProfile)> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl RemoteUploader for RecordingUploader {
    async fn upload(
        &self,
        _payload: Bytes,
        folder: &str,
        filename: &str,
        profile: UploadProfile,
    ) -> SyncResult<String> {
        if let Some(needle) = self.reject_containing.lock().clone() {
            if filename.contains(&needle) {
                return Err(SyncError::upload_rejected(
                    filename,
                    "remote endpoint rejected the payload",
                ));
            }
        }
        self.uploads
            .lock()
            .push((folder.to_string(), filename.to_string(), profile));
        Ok(format!("https://cdn.example.com/{}/{}", folder, filename))
    }
}

/// Job queue double that records submissions and can be switched to reject
#[derive(Default)]
struct RecordingJobQueue {
    submissions: Mutex<Vec<(VideoMetadata, DocumentId)>>,
    reject: Mutex<bool>,
}

#[async_trait]
impl VideoJobQueue for RecordingJobQueue {
    async fn submit(
        &self,
        _payload: Bytes,
        metadata: &VideoMetadata,
        parent: &DocumentId,
    ) -> SyncResult<JobId> {
        if *self.reject.lock() {
            return Err(SyncError::job_submission(
                parent.as_str(),
                "encoder queue unavailable",
            ));
        }
        let mut submissions = self.submissions.lock();
        submissions.push((metadata.clone(), parent.clone()));
        Ok(JobId::from_string(format!("job_{}", submissions.len())))
    }
}

struct Harness {
    store: Arc<MemoryStagingStore>,
    uploader: Arc<RecordingUploader>,
    jobs: Arc<RecordingJobQueue>,
    orchestrator: SyncOrchestrator,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStagingStore::new());
    let uploader = Arc::new(RecordingUploader::default());
    let jobs = Arc::new(RecordingJobQueue::default());
    let orchestrator = SyncOrchestrator::new(store.clone(), uploader.clone(), jobs.clone())
        .with_config(SyncConfig::new().without_min_duration());
    Harness {
        store,
        uploader,
        jobs,
        orchestrator,
    }
}

async fn stage(store: &MemoryStagingStore, content_type: &str) -> LocalRef {
    store
        .stage(
            StagePut::new().with_content_type(content_type),
            Bytes::from_static(b"payload bytes"),
        )
        .await
        .expect("staging in memory never fails")
}

#[tokio::test]
async fn document_without_staged_refs_completes_immediately() {
    // Arrange
    let h = harness();
    let progress_log: Arc<Mutex<Vec<SyncProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let log = progress_log.clone();
    let orchestrator = SyncOrchestrator::new(h.store.clone(), h.uploader.clone(), h.jobs.clone())
        .with_config(SyncConfig::new().without_min_duration())
        .with_on_progress(move |p| log.lock().push(p.clone()));

    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Media(
        MediaField {
            label: "banner".to_string(),
            kind: MediaKind::Image,
            value: MediaRef::from_url("https://cdn.example.com/existing.jpg"),
        },
    ));
    let before = document.clone();

    // Act
    let outcome = orchestrator.run(document).await.unwrap();

    // Assert: no uploads, document untouched, single 100% callback
    assert_eq!(outcome.report.total, 0);
    assert_eq!(outcome.document, before);
    assert!(h.uploader.recorded().is_empty());
    let calls = progress_log.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].percent, 100);
}

#[tokio::test]
async fn scalar_media_upload_rewrites_field_and_cleans_up() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "image/png").await;
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Media(
        MediaField {
            label: "banner".to_string(),
            kind: MediaKind::Image,
            value: MediaRef::Local(id.clone()),
        },
    ));

    // Act
    let outcome = h.orchestrator.run(document).await.unwrap();

    // Assert: remote URL written back, staged copy gone
    let Node::Media(field) = &outcome.document.nodes[0] else {
        panic!("node shape changed");
    };
    let url = field.value.as_str();
    assert!(url.starts_with("https://cdn.example.com/"));
    assert!(url.ends_with(&format!("{}.png", id)));
    assert!(h.store.read(&id).await.unwrap().is_none());
    assert_eq!(outcome.document.pending_count(), 0);

    // Folder derives from slugged author and field label
    let recorded = h.uploader.recorded();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].0.starts_with("Maria_Silva/banner/"));
    assert_eq!(recorded[0].2, UploadProfile::Image);
}

#[tokio::test]
async fn gallery_uploads_only_local_slots_in_place() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "image/jpeg").await;
    let document = Document::new("Ana Souza", ContentKind::Promotion).with_node(Node::MediaList(
        MediaList {
            label: "gallery".to_string(),
            entries: vec![
                MediaEntry::Bare(MediaRef::Local(id.clone())),
                MediaEntry::Bare(MediaRef::from_url("https://cdn.example.com/kept.jpg")),
            ],
        },
    ));

    // Act
    let outcome = h.orchestrator.run(document).await.unwrap();

    // Assert: slot order preserved, remote slot untouched
    let Node::MediaList(list) = &outcome.document.nodes[0] else {
        panic!("node shape changed");
    };
    assert!(list.entries[0].url().as_str().starts_with("https://cdn.example.com/"));
    assert!(list.entries[0].url().as_str().contains(id.as_str()));
    assert_eq!(list.entries[1].url().as_str(), "https://cdn.example.com/kept.jpg");
    assert_eq!(outcome.report.total, 1);
    assert_eq!(outcome.report.completed, 1);
    assert!(h.store.read(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn framed_gallery_entry_keeps_its_extra_fields() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "image/webp").await;
    let mut extra = serde_json::Map::new();
    extra.insert(
        "caption".to_string(),
        serde_json::Value::String("sunset over the bay".to_string()),
    );
    let document = Document::new("Ana Souza", ContentKind::Article).with_node(Node::MediaList(
        MediaList {
            label: "gallery".to_string(),
            entries: vec![MediaEntry::Framed {
                url: MediaRef::Local(id.clone()),
                extra,
            }],
        },
    ));

    // Act
    let outcome = h.orchestrator.run(document).await.unwrap();

    // Assert
    let Node::MediaList(list) = &outcome.document.nodes[0] else {
        panic!("node shape changed");
    };
    let MediaEntry::Framed { url, extra } = &list.entries[0] else {
        panic!("entry shape must survive synchronization");
    };
    assert!(url.as_str().starts_with("https://cdn.example.com/"));
    assert_eq!(extra["caption"], "sunset over the bay");
}

#[tokio::test]
async fn rich_text_uploads_once_per_distinct_id() {
    // Arrange: one id embedded under both conventions
    let h = harness();
    let id = stage(&h.store, "image/png").await;
    let html = format!(
        r#"<p><img src="blob:{id}"><img data-local-id="{id}" src="placeholder"></p>"#,
        id = id.as_str()
    );
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::RichText(
        RichText {
            block_id: "b1".to_string(),
            html,
        },
    ));

    // Act
    let outcome = h.orchestrator.run(document).await.unwrap();

    // Assert: one upload, both embeds rewritten, marker stripped
    assert_eq!(h.uploader.recorded().len(), 1);
    assert_eq!(outcome.report.total, 1);
    let Node::RichText(fragment) = &outcome.document.nodes[0] else {
        panic!("node shape changed");
    };
    assert!(!fragment.html.contains("blob:"));
    assert!(!fragment.html.contains("data-local-id"));
    assert_eq!(
        fragment.html.matches("https://cdn.example.com/").count(),
        2
    );
    assert!(h.store.read(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn internal_video_uploads_under_the_video_profile() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "video/mp4").await;
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Video(
        VideoField {
            label: "headline_video".to_string(),
            value: MediaRef::Local(id.clone()),
            source: VideoSource::Internal,
        },
    ));

    // Act
    let outcome = h.orchestrator.run(document).await.unwrap();

    // Assert
    let Node::Video(video) = &outcome.document.nodes[0] else {
        panic!("node shape changed");
    };
    assert!(video.value.as_str().ends_with(&format!("{}.mp4", id)));
    let recorded = h.uploader.recorded();
    assert_eq!(recorded[0].2, UploadProfile::Video);
    assert!(h.store.read(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn external_video_is_queued_and_left_as_placeholder() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "video/mp4").await;
    let metadata = VideoMetadata {
        title: "Launch interview".to_string(),
        description: "Full cut".to_string(),
        tags: vec!["news".to_string()],
        visibility: "unlisted".to_string(),
    };
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Video(
        VideoField {
            label: "interview".to_string(),
            value: MediaRef::Local(id.clone()),
            source: VideoSource::External {
                metadata: metadata.clone(),
            },
        },
    ));
    let document_id = document.id.clone();

    // Act
    let outcome = h.orchestrator.run(document).await.unwrap();

    // Assert: placeholder carries the job id, queue got payload + metadata
    let Node::Video(video) = &outcome.document.nodes[0] else {
        panic!("node shape changed");
    };
    let placeholder =
        PendingPlaceholder::parse(video.value.as_str()).expect("placeholder URL expected");
    assert_eq!(placeholder.job_id, JobId::from("job_1"));
    assert!(video.value.as_str().starts_with("https://www.youtube.com/embed/"));

    let submissions = h.jobs.submissions.lock();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, metadata);
    assert_eq!(submissions[0].1, document_id);
    drop(submissions);

    assert_eq!(outcome.report.queued_jobs, vec![JobId::from("job_1")]);
    assert!(h.store.read(&id).await.unwrap().is_none());
    assert!(h.uploader.recorded().is_empty());
}

#[tokio::test]
async fn second_run_over_synchronized_document_is_a_no_op() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "image/png").await;
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Media(
        MediaField {
            label: "banner".to_string(),
            kind: MediaKind::Image,
            value: MediaRef::Local(id),
        },
    ));

    // Act
    let first = h.orchestrator.run(document).await.unwrap();
    let second = h.orchestrator.run(first.document.clone()).await.unwrap();

    // Assert
    assert_eq!(first.report.total, 1);
    assert_eq!(second.report.total, 0);
    assert_eq!(second.document, first.document);
    assert_eq!(h.uploader.recorded().len(), 1);
}

#[tokio::test]
async fn missing_staged_blob_is_skipped_with_a_warning() {
    // Arrange: a reference whose payload was never staged (or already purged)
    let h = harness();
    let dangling = LocalRef::generate();
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Media(
        MediaField {
            label: "banner".to_string(),
            kind: MediaKind::Image,
            value: MediaRef::Local(dangling.clone()),
        },
    ));

    // Act
    let outcome = h.orchestrator.run(document).await.unwrap();

    // Assert: field untouched, run still accounts for the operation
    let Node::Media(field) = &outcome.document.nodes[0] else {
        panic!("node shape changed");
    };
    assert_eq!(field.value, MediaRef::Local(dangling.clone()));
    assert_eq!(outcome.report.total, 1);
    assert_eq!(outcome.report.completed, 1);
    assert_eq!(outcome.report.unresolved.len(), 1);
    assert_eq!(outcome.report.unresolved[0].reference, dangling);
    assert!(h.uploader.recorded().is_empty());
}

#[tokio::test]
async fn fatal_video_queue_failure_aborts_the_run() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "video/mp4").await;
    *h.jobs.reject.lock() = true;
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Video(
        VideoField {
            label: "interview".to_string(),
            value: MediaRef::Local(id.clone()),
            source: VideoSource::External {
                metadata: VideoMetadata::default(),
            },
        },
    ));

    // Act
    let error = h.orchestrator.run(document).await.unwrap_err();

    // Assert: human-readable error, staged copy retained for retry
    assert!(error.to_string().contains("Video job submission failed"));
    assert!(error.to_string().contains("encoder queue unavailable"));
    assert!(h.store.read(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn fatal_internal_video_rejection_surfaces_a_readable_error() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "video/mp4").await;
    h.uploader.reject_filenames_containing(id.as_str());
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Video(
        VideoField {
            label: "banner_video".to_string(),
            value: MediaRef::Local(id.clone()),
            source: VideoSource::Internal,
        },
    ));

    // Act
    let error = h.orchestrator.run(document).await.unwrap_err();

    // Assert
    let message = error.to_string();
    assert!(!message.is_empty());
    assert!(message.contains("Upload rejected"));
    assert!(message.contains("remote endpoint rejected the payload"));
}

#[tokio::test]
async fn tolerated_gallery_failure_keeps_the_run_going() {
    // Arrange: two staged slots, the first one rejected by the endpoint
    let h = harness();
    let failing = stage(&h.store, "image/png").await;
    let passing = stage(&h.store, "image/png").await;
    h.uploader.reject_filenames_containing(failing.as_str());
    let document = Document::new("Ana Souza", ContentKind::Promotion).with_node(Node::MediaList(
        MediaList {
            label: "gallery".to_string(),
            entries: vec![
                MediaEntry::Bare(MediaRef::Local(failing.clone())),
                MediaEntry::Bare(MediaRef::Local(passing.clone())),
            ],
        },
    ));

    // Act
    let outcome = h.orchestrator.run(document).await.unwrap();

    // Assert: failed slot stays local and is reported, the other resolves
    let Node::MediaList(list) = &outcome.document.nodes[0] else {
        panic!("node shape changed");
    };
    assert_eq!(*list.entries[0].url(), MediaRef::Local(failing.clone()));
    assert!(list.entries[1].url().as_str().starts_with("https://cdn.example.com/"));
    assert_eq!(outcome.report.unresolved.len(), 1);
    assert_eq!(outcome.report.unresolved[0].reference, failing);
    assert_eq!(outcome.report.completed, 2);
    assert!(h.store.read(&failing).await.unwrap().is_some());
    assert!(h.store.read(&passing).await.unwrap().is_none());
}

#[tokio::test]
async fn progress_ticks_once_per_asset_and_finishes_at_full() {
    // Arrange: three assets across nested nodes
    let h = harness();
    let banner = stage(&h.store, "image/png").await;
    let slot = stage(&h.store, "image/jpeg").await;
    let inline = stage(&h.store, "image/png").await;

    let progress_log: Arc<Mutex<Vec<SyncProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let log = progress_log.clone();
    let orchestrator = SyncOrchestrator::new(h.store.clone(), h.uploader.clone(), h.jobs.clone())
        .with_config(SyncConfig::new().without_min_duration())
        .with_on_progress(move |p| log.lock().push(p.clone()));

    let document = Document::new("Maria Silva", ContentKind::Article)
        .with_node(Node::Media(MediaField {
            label: "banner".to_string(),
            kind: MediaKind::Image,
            value: MediaRef::Local(banner),
        }))
        .with_node(Node::Section {
            label: "body".to_string(),
            children: vec![
                Node::MediaList(MediaList {
                    label: "gallery".to_string(),
                    entries: vec![MediaEntry::Bare(MediaRef::Local(slot))],
                }),
                Node::RichText(RichText {
                    block_id: "b1".to_string(),
                    html: format!(r#"<img src="blob:{}">"#, inline.as_str()),
                }),
            ],
        });

    // Act
    let outcome = orchestrator.run(document).await.unwrap();

    // Assert: a tick per asset, monotone completion, final 100%
    assert_eq!(outcome.report.total, 3);
    assert_eq!(outcome.report.completed, 3);
    let calls = progress_log.lock();
    let per_asset: Vec<_> = calls.iter().filter(|p| p.completed > 0 && p.total == 3).collect();
    assert_eq!(per_asset.len(), 4); // 3 ticks + final completion
    assert!(per_asset.windows(2).all(|w| w[0].completed <= w[1].completed));
    assert_eq!(calls.last().unwrap().percent, 100);
    assert_eq!(outcome.document.pending_count(), 0);
}

#[tokio::test]
async fn event_stream_narrates_the_run_lifecycle() {
    // Arrange
    let h = harness();
    let id = stage(&h.store, "image/png").await;
    let document = Document::new("Maria Silva", ContentKind::Article).with_node(Node::Media(
        MediaField {
            label: "banner".to_string(),
            kind: MediaKind::Image,
            value: MediaRef::Local(id),
        },
    ));
    let mut events = h.orchestrator.subscribe();

    // Act
    h.orchestrator.run(document).await.unwrap();

    let mut names = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(200), events.next()).await
    {
        let name = event.expect("no lag expected at this volume").event_name();
        names.push(name);
        if name == "completed" {
            break;
        }
    }

    // Assert
    assert_eq!(
        names,
        vec!["counting", "started", "progress", "finalizing", "completed"]
    );
}
