use chrono::{NaiveDate, Utc};

/// Strategy for deriving remote destination folders
pub trait FolderStrategy: Send + Sync {
    /// Folder for an asset uploaded today
    fn folder(&self, author: &str, context: &str) -> String {
        self.folder_for_date(author, context, Utc::now().date_naive())
    }

    /// Folder for an asset on a specific date
    fn folder_for_date(&self, author: &str, context: &str, date: NaiveDate) -> String;
}

/// Default strategy: `author-slug/context/YYYY-MM-DD`.
///
/// Deterministic and human-legible so remote storage stays organizably
/// namespaced without a separate index.
#[derive(Debug, Clone)]
pub struct DefaultFolderStrategy;

impl FolderStrategy for DefaultFolderStrategy {
    fn folder_for_date(&self, author: &str, context: &str, date: NaiveDate) -> String {
        format!(
            "{}/{}/{}",
            slug(author),
            slug(context),
            date.format("%Y-%m-%d")
        )
    }
}

/// Sanitize a name into a safe path segment: keep alphanumerics (accents
/// included), drop everything else, collapse whitespace runs to `_`.
pub fn slug(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let joined = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    if joined.is_empty() {
        "anonymous".to_string()
    } else {
        joined
    }
}
