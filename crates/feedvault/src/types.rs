//! Core data types for posts, observed requests and resolved media.

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityError;

/// How a feed item was classified by link discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Image,
    #[serde(alias = "clip")]
    Reel,
    Carousel,
}

impl PostKind {
    /// Stable lowercase name, used for storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Image => "image",
            PostKind::Reel => "reel",
            PostKind::Carousel => "carousel",
        }
    }

    /// Parse the lowercase name back into a kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Some(PostKind::Image),
            "reel" | "clip" => Some(PostKind::Reel),
            "carousel" => Some(PostKind::Carousel),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feed item to resolve. `url` may be a site-relative path (`/p/abc/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
}

impl Post {
    pub fn new(url: impl Into<String>, kind: PostKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// What the request URL says about the asset behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentHint {
    Image,
    Video,
    Webp,
}

impl ContentHint {
    /// `.jpg` and `.webp` both count as still images.
    pub fn is_image(&self) -> bool {
        matches!(self, ContentHint::Image | ContentHint::Webp)
    }

    pub fn is_video(&self) -> bool {
        matches!(self, ContentHint::Video)
    }
}

/// A request observed during one capture window that passed the eligibility gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRequest {
    pub url: String,
    pub content_hint: ContentHint,
    /// Final path segment of the URL.
    pub signature: String,
    /// Decoded from the `efg` delivery metadata; video requests only.
    pub asset_id: Option<String>,
    /// Encoding profile tag from the same metadata.
    pub variant_tag: Option<String>,
}

/// One resolved asset, the unit handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub link: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    #[serde(rename = "imgIndex")]
    pub img_index: Option<u32>,
    #[serde(rename = "postURL")]
    pub post_url: String,
}

/// A persisted entry: the resolved media plus its storage identity and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMedia {
    pub id: i64,
    /// Zero-based position within the run that produced it.
    pub seq: i64,
    #[serde(flatten)]
    pub media: ResolvedMedia,
    pub created_at: Option<String>,
}

/// Errors that can occur in the resolution engine.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Page evaluation failed: {0}")]
    Evaluate(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid post: {0}")]
    InvalidPost(String),
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
