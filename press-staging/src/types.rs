use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that distinguishes a local staging token from a remote URL
pub const LOCAL_REF_PREFIX: &str = "local_";

/// Opaque token standing in for a not-yet-uploaded binary asset.
///
/// Format: `local_<millis>_<rand>`. A `LocalRef` is used anywhere a media
/// field expects a URL and must never be persisted to the remote database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalRef(pub String);

impl LocalRef {
    /// Generate a fresh, collision-resistant local reference
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix: String = rand::thread_rng()
            .sample_iter(rand::distributions::Alphanumeric)
            .take(9)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        Self(format!("{}{}_{}", LOCAL_REF_PREFIX, millis, suffix))
    }

    /// Parse a reference string; returns `None` unless it carries the local prefix
    pub fn parse(reference: &str) -> Option<Self> {
        if reference.starts_with(LOCAL_REF_PREFIX) {
            Some(Self(reference.to_string()))
        } else {
            None
        }
    }

    /// Check whether a reference string is a local staging token
    pub fn is_local(reference: &str) -> bool {
        reference.starts_with(LOCAL_REF_PREFIX)
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A staged payload together with its metadata
#[derive(Debug, Clone)]
pub struct StagedBlob {
    pub id: LocalRef,
    pub payload: Bytes,
    pub content_type: String,
    pub original_name: Option<String>,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl StagedBlob {
    /// Metadata-only view of this blob
    pub fn info(&self) -> StagedBlobInfo {
        StagedBlobInfo {
            id: self.id.clone(),
            content_type: self.content_type.clone(),
            original_name: self.original_name.clone(),
            size_bytes: self.size_bytes,
            created_at: self.created_at,
        }
    }

    /// File extension derived from the content type (`image/png` -> `png`)
    pub fn extension(&self) -> &str {
        self.content_type.split('/').nth(1).unwrap_or("bin")
    }
}

/// Metadata about a staged blob, without the payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedBlobInfo {
    pub id: LocalRef,
    pub content_type: String,
    pub original_name: Option<String>,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Request to stage a payload
#[derive(Debug, Clone, Default)]
pub struct StagePut {
    pub content_type: Option<String>,
    pub original_name: Option<String>,
}

impl StagePut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set content type
    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the attached file's original name
    pub fn with_original_name<S: Into<String>>(mut self, name: S) -> Self {
        self.original_name = Some(name.into());
        self
    }
}
