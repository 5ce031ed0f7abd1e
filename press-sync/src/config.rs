use std::time::Duration;

/// How a node type reacts to an upload failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Abort the whole run; the error propagates to the caller
    Fatal,
    /// Log, leave the reference unresolved, record a warning, keep going
    Tolerate,
}

/// Explicit per-node-type failure policy.
///
/// Defaults: scalar media and video fields are fatal (a broken banner or
/// headline video should block the publish); gallery entries and inline
/// rich-text images are tolerated per item (one broken thumbnail should not
/// sink the whole save). Tolerated failures always surface as warnings in
/// the run report.
#[derive(Debug, Clone, Copy)]
pub struct FailurePolicy {
    pub media: FailureMode,
    pub media_list: FailureMode,
    pub rich_text: FailureMode,
    pub video: FailureMode,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            media: FailureMode::Fatal,
            media_list: FailureMode::Tolerate,
            rich_text: FailureMode::Tolerate,
            video: FailureMode::Fatal,
        }
    }
}

impl FailurePolicy {
    /// Every node type fatal - strictest mode
    pub fn all_fatal() -> Self {
        Self {
            media: FailureMode::Fatal,
            media_list: FailureMode::Fatal,
            rich_text: FailureMode::Fatal,
            video: FailureMode::Fatal,
        }
    }

    pub fn with_media_list(mut self, mode: FailureMode) -> Self {
        self.media_list = mode;
        self
    }

    pub fn with_rich_text(mut self, mode: FailureMode) -> Self {
        self.rich_text = mode;
        self
    }

    pub fn with_video(mut self, mode: FailureMode) -> Self {
        self.video = mode;
        self
    }
}

/// Configuration for synchronization runs
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// UX smoothing floor: if every upload finishes faster than this, the
    /// run waits out the remainder so the progress UI does not flash.
    /// `None` skips the wait entirely (test harnesses).
    pub min_run_duration: Option<Duration>,

    /// Base URL under which external-job placeholders are rendered
    pub embed_base: String,

    /// Per-node-type failure handling
    pub policy: FailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_run_duration: Some(Duration::from_millis(600)),
            embed_base: "https://www.youtube.com/embed".to_string(),
            policy: FailurePolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum perceived run duration
    pub fn with_min_run_duration(mut self, duration: Duration) -> Self {
        self.min_run_duration = Some(duration);
        self
    }

    /// Skip the minimum-duration wait (test harnesses)
    pub fn without_min_duration(mut self) -> Self {
        self.min_run_duration = None;
        self
    }

    /// Set the placeholder embed base
    pub fn with_embed_base<S: Into<String>>(mut self, base: S) -> Self {
        self.embed_base = base.into();
        self
    }

    /// Set the failure policy
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}
