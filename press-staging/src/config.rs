use std::path::PathBuf;

/// Configuration for staging stores
#[derive(Debug, Clone)]
pub struct StagingConfig {
    /// Root directory for the filesystem backend
    pub root_dir: PathBuf,

    /// Absolute max size allowed for a single staged payload (safety guard)
    pub max_payload_bytes: u64,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(".press-staging"),
            max_payload_bytes: 1024 * 1024 * 1024, // 1GB, external-platform video ceiling
        }
    }
}

impl StagingConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory for durable staging
    pub fn with_root_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.root_dir = dir.into();
        self
    }

    /// Set the max payload size
    pub fn with_max_payload_bytes(mut self, bytes: u64) -> Self {
        self.max_payload_bytes = bytes;
        self
    }
}
