use press_staging::LocalRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DocumentId;
use crate::richtext;

/// What a media field holds: nothing, a staged local token, or a remote URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaRef {
    Empty,
    Local(LocalRef),
    Remote(String),
}

impl MediaRef {
    /// Classify a raw reference string by the local prefix
    pub fn from_url(reference: &str) -> Self {
        if reference.is_empty() {
            Self::Empty
        } else if let Some(local) = LocalRef::parse(reference) {
            Self::Local(local)
        } else {
            Self::Remote(reference.to_string())
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn as_local(&self) -> Option<&LocalRef> {
        match self {
            Self::Local(local) => Some(local),
            _ => None,
        }
    }

    /// The reference as it would appear in a URL-typed field
    pub fn as_str(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Local(local) => local.as_str(),
            Self::Remote(url) => url,
        }
    }
}

impl From<String> for MediaRef {
    fn from(reference: String) -> Self {
        Self::from_url(&reference)
    }
}

impl From<MediaRef> for String {
    fn from(media_ref: MediaRef) -> Self {
        media_ref.as_str().to_string()
    }
}

/// Asset class of a scalar media field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// Scalar media field (main image URL, advertiser logo, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaField {
    pub label: String,
    pub kind: MediaKind,
    pub value: MediaRef,
}

/// One slot of an ordered media list.
///
/// Slots come in two wire shapes - a bare URL string or a `{url, ...}`
/// object - and the shape must survive synchronization untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaEntry {
    Bare(MediaRef),
    Framed {
        url: MediaRef,
        #[serde(flatten)]
        extra: serde_json::Map<String, Value>,
    },
}

impl MediaEntry {
    pub fn url(&self) -> &MediaRef {
        match self {
            Self::Bare(url) => url,
            Self::Framed { url, .. } => url,
        }
    }

    pub fn set_url(&mut self, new_url: MediaRef) {
        match self {
            Self::Bare(url) => *url = new_url,
            Self::Framed { url, .. } => *url = new_url,
        }
    }
}

/// Ordered list of media slots (banner image slots, gallery arrays)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaList {
    pub label: String,
    pub entries: Vec<MediaEntry>,
}

/// Serialized rich-text fragment that may embed staged images inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    pub block_id: String,
    pub html: String,
}

/// Where a video asset is published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    /// Uploaded synchronously to the video destination profile
    Internal,
    /// Handed to the external encoding/publishing job queue
    External { metadata: VideoMetadata },
}

/// Metadata payload accompanying an external-platform video submission
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: String,
}

/// Block-level video descriptor with a source discriminator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoField {
    pub label: String,
    pub value: MediaRef,
    pub source: VideoSource,
}

/// One node of the editable document tree.
///
/// The four media-bearing shapes plus a nesting section; the orchestrator
/// dispatches on the tag and makes no assumption about schema depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Media(MediaField),
    MediaList(MediaList),
    RichText(RichText),
    Video(VideoField),
    Section { label: String, children: Vec<Node> },
}

impl Node {
    /// Number of staged references this node (and its children) still holds.
    ///
    /// Rich-text fragments count *distinct* embedded ids, matching the one
    /// upload per distinct id the resolution pass performs.
    pub fn pending_count(&self) -> usize {
        match self {
            Self::Media(field) => field.value.is_local() as usize,
            Self::Video(video) => video.value.is_local() as usize,
            Self::MediaList(list) => list
                .entries
                .iter()
                .filter(|entry| entry.url().is_local())
                .count(),
            Self::RichText(fragment) => richtext::extract_local_ids(&fragment.html).len(),
            Self::Section { children, .. } => children.iter().map(Node::pending_count).sum(),
        }
    }

    fn collect_pending(&self, out: &mut Vec<LocalRef>) {
        match self {
            Self::Media(field) => {
                if let Some(local) = field.value.as_local() {
                    out.push(local.clone());
                }
            }
            Self::Video(video) => {
                if let Some(local) = video.value.as_local() {
                    out.push(local.clone());
                }
            }
            Self::MediaList(list) => {
                for entry in &list.entries {
                    if let Some(local) = entry.url().as_local() {
                        out.push(local.clone());
                    }
                }
            }
            Self::RichText(fragment) => out.extend(richtext::extract_local_ids(&fragment.html)),
            Self::Section { children, .. } => {
                for child in children {
                    child.collect_pending(out);
                }
            }
        }
    }
}

/// Content aggregate variant being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    AdvertiserProfile,
    Promotion,
}

/// The full editable content aggregate being synchronized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub author: String,
    pub kind: ContentKind,
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new<A: Into<String>>(author: A, kind: ContentKind) -> Self {
        Self {
            id: DocumentId::new(),
            author: author.into(),
            kind,
            nodes: Vec::new(),
        }
    }

    /// Builder-style node append
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Every staged reference still present, in document order.
    ///
    /// Callers should check this is empty (or placeholders only) before
    /// treating a save as complete, since tolerated per-item failures can
    /// leave stragglers behind.
    pub fn pending_references(&self) -> Vec<LocalRef> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_pending(&mut out);
        }
        out
    }

    /// Total upload operations a synchronization run would perform
    pub fn pending_count(&self) -> usize {
        self.nodes.iter().map(Node::pending_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_ref_classifies_by_prefix() {
        assert_eq!(MediaRef::from_url(""), MediaRef::Empty);
        assert!(MediaRef::from_url("local_123_abc").is_local());
        assert_eq!(
            MediaRef::from_url("https://cdn.example.com/a.jpg"),
            MediaRef::Remote("https://cdn.example.com/a.jpg".to_string())
        );
    }

    #[test]
    fn pending_count_walks_nested_sections() {
        let doc = Document::new("Maria Silva", ContentKind::Article)
            .with_node(Node::MediaList(MediaList {
                label: "banner".to_string(),
                entries: vec![
                    MediaEntry::Bare(MediaRef::from_url("local_1_aaaaaaaaa")),
                    MediaEntry::Bare(MediaRef::from_url("https://cdn.example.com/x.jpg")),
                ],
            }))
            .with_node(Node::Section {
                label: "blocks".to_string(),
                children: vec![Node::Media(MediaField {
                    label: "content_image".to_string(),
                    kind: MediaKind::Image,
                    value: MediaRef::from_url("local_2_bbbbbbbbb"),
                })],
            });

        assert_eq!(doc.pending_count(), 2);
        assert_eq!(doc.pending_references().len(), 2);
    }

    #[test]
    fn framed_entry_round_trips_extra_fields() {
        let mut extra = serde_json::Map::new();
        extra.insert("caption".to_string(), Value::String("sunset".to_string()));
        let entry = MediaEntry::Framed {
            url: MediaRef::from_url("https://cdn.example.com/a.jpg"),
            extra,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["url"], "https://cdn.example.com/a.jpg");
        assert_eq!(json["caption"], "sunset");

        let back: MediaEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
