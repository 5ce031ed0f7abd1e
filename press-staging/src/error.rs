use thiserror::Error;

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

/// Errors that can occur while staging local media
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("Staged record is corrupt: {id}: {message}")]
    Corrupt { id: String, message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StagingError {
    /// Create a corrupt-record error
    pub fn corrupt<I: Into<String>, M: Into<String>>(id: I, message: M) -> Self {
        Self::Corrupt {
            id: id.into(),
            message: message.into(),
        }
    }
}
