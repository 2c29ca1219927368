//! Media references attached to questions
//!
//! Questions never carry media bytes. They hold a [`MediaId`] that the
//! media store resolves into something displayable, together with the
//! [`MediaKind`] so the presentation layer knows which player to use.

use std::fmt::Display;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// The kind of a media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A still image
    #[default]
    Image,
    /// An audio clip
    Audio,
    /// A video clip
    Video,
}

impl MediaKind {
    /// Derives the media kind from a MIME type
    ///
    /// `audio/*` and `video/*` map to their kinds, everything else is
    /// treated as an image.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("audio/") {
            Self::Audio
        } else if mime_type.starts_with("video/") {
            Self::Video
        } else {
            Self::Image
        }
    }
}

/// Reference to a media asset
///
/// Either an id handed out by the media store or an inline `data:`/`blob:`
/// reference that is displayable as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    /// Wraps a raw reference
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the raw reference
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this reference is already displayable without a lookup
    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:") || self.0.starts_with("blob:")
    }
}

impl Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A media asset attached to a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MediaAttachment {
    /// Reference resolved through the media store
    #[garde(custom(|v: &MediaId, _| validate_media_id(v)))]
    pub id: MediaId,
    /// Kind of the referenced asset
    #[garde(skip)]
    pub kind: MediaKind,
    /// Hidden behind a blur until the answer is revealed
    #[serde(default)]
    #[garde(skip)]
    pub blurred: bool,
}

fn validate_media_id(id: &MediaId) -> garde::Result {
    let len = id.as_str().len();
    if len == 0 || len > crate::constants::media::MAX_ID_LENGTH {
        Err(garde::Error::new(format!(
            "media reference length {len} is outside of the bounds [1,{}]",
            crate::constants::media::MAX_ID_LENGTH
        )))
    } else {
        Ok(())
    }
}
