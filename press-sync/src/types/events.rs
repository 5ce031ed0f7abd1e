use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State machine for one synchronization run.
///
/// `Idle -> Counting -> Uploading(i/N) -> Finalizing -> Done`, with `Failed`
/// reachable only from `Uploading`. There is no cancelled state: once started
/// a run completes or fails, and callers that discard the future must accept
/// that remote side effects already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Counting,
    Uploading { completed: usize, total: usize },
    Finalizing,
    Done,
    Failed,
}

/// Aggregate progress across a heterogeneous set of upload operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// 0-100; 100 when `total == 0`
    pub percent: u8,
    /// Human-readable status line for the progress UI
    pub message: String,
    pub completed: usize,
    pub total: usize,
}

impl SyncProgress {
    pub fn new(completed: usize, total: usize, message: String) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((completed * 100) as f64 / total as f64).round() as u8
        };
        Self {
            percent,
            message,
            completed,
            total,
        }
    }
}

/// Minimal stable event protocol for synchronization observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
    /// Discovery pass started
    Counting { at: DateTime<Utc> },

    /// Discovery finished; `total` uploads will be performed
    Started { total: usize, at: DateTime<Utc> },

    /// One asset finished (uploaded, queued, or skipped as missing)
    Progress {
        progress: SyncProgress,
        at: DateTime<Utc>,
    },

    /// All uploads done, waiting out the minimum perceived duration
    Finalizing { at: DateTime<Utc> },

    /// Run finished; the returned document holds no staged references
    Completed {
        progress: SyncProgress,
        at: DateTime<Utc>,
    },

    /// Run aborted on a fatal node failure
    Failed { error: String, at: DateTime<Utc> },
}

impl SyncEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Counting { .. } => "counting",
            Self::Started { .. } => "started",
            Self::Progress { .. } => "progress",
            Self::Finalizing { .. } => "finalizing",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    /// The run state this event corresponds to
    pub fn state(&self) -> SyncState {
        match self {
            Self::Counting { .. } => SyncState::Counting,
            Self::Started { total, .. } => SyncState::Uploading {
                completed: 0,
                total: *total,
            },
            Self::Progress { progress, .. } => SyncState::Uploading {
                completed: progress.completed,
                total: progress.total,
            },
            Self::Finalizing { .. } => SyncState::Finalizing,
            Self::Completed { .. } => SyncState::Done,
            Self::Failed { .. } => SyncState::Failed,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Counting { at }
            | Self::Started { at, .. }
            | Self::Progress { at, .. }
            | Self::Finalizing { at }
            | Self::Completed { at, .. }
            | Self::Failed { at, .. } => at,
        }
    }
}
