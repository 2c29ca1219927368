//! Media storage collaborator
//!
//! Questions only keep a [`MediaId`] and a [`MediaKind`]; the bytes live in
//! a [`MediaStore`]. Inline `data:` and `blob:` references bypass the store
//! entirely: they resolve to themselves and are never deleted.

use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use web_time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{
    constants,
    quiz::{
        media::{MediaId, MediaKind},
        question::Question,
    },
};

/// Errors raised by a media store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The file was empty
    #[error("cannot store an empty media file")]
    Empty,
    /// The storage backend rejected the operation
    #[error("media storage failed: {0}")]
    Backend(String),
}

/// A freshly stored asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Id to keep in the question
    pub id: MediaId,
    /// Kind derived from the MIME type
    pub kind: MediaKind,
}

/// A resolved asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// Something the presentation layer can display directly
    pub reference: String,
    /// Kind of the asset
    pub kind: MediaKind,
}

/// Trait for storing media bytes outside the quiz content
pub trait MediaStore {
    /// Stores a file and returns its id and kind
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stored.
    fn store_media(&mut self, bytes: &[u8], mime_type: &str) -> Result<StoredMedia, Error>;

    /// Resolves an id into a displayable reference, `None` if unknown
    fn get_media(&self, id: &MediaId) -> Option<ResolvedMedia>;

    /// Deletes a stored file; unknown ids are ignored
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to delete the file.
    fn delete_media(&mut self, id: &MediaId) -> Result<(), Error>;
}

/// Generates an id of the form `media_<unix millis>_<7 base36 chars>`
pub fn generate_media_id() -> MediaId {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis();
    let suffix: String = (0..constants::media::ID_SUFFIX_LENGTH)
        .map(|_| char::from(ALPHABET[fastrand::usize(..ALPHABET.len())]))
        .collect();

    MediaId::new(format!("{}{millis}_{suffix}", constants::media::ID_PREFIX))
}

/// Kind of an inline `data:`/`blob:` reference, sniffed from its MIME part
fn inline_kind(reference: &str) -> MediaKind {
    if reference.contains("audio/") {
        MediaKind::Audio
    } else if reference.contains("video/") {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    mime_type: String,
    kind: MediaKind,
}

/// Keeps media bytes in memory and resolves them to `data:` URLs
#[derive(Debug, Clone, Default)]
pub struct MemoryMediaStore {
    entries: HashMap<MediaId, Entry>,
}

impl MemoryMediaStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` resolves to something
    pub fn contains(&self, id: &MediaId) -> bool {
        id.is_inline() || self.entries.contains_key(id)
    }
}

impl MediaStore for MemoryMediaStore {
    fn store_media(&mut self, bytes: &[u8], mime_type: &str) -> Result<StoredMedia, Error> {
        if bytes.is_empty() {
            return Err(Error::Empty);
        }

        let mut id = generate_media_id();
        while self.entries.contains_key(&id) {
            id = generate_media_id();
        }
        let kind = MediaKind::from_mime(mime_type);

        tracing::debug!(%id, ?kind, size = bytes.len(), "storing media");
        self.entries.insert(
            id.clone(),
            Entry {
                bytes: bytes.to_vec(),
                mime_type: mime_type.to_owned(),
                kind,
            },
        );

        Ok(StoredMedia { id, kind })
    }

    fn get_media(&self, id: &MediaId) -> Option<ResolvedMedia> {
        if id.is_inline() {
            return Some(ResolvedMedia {
                reference: id.as_str().to_owned(),
                kind: inline_kind(id.as_str()),
            });
        }

        self.entries.get(id).map(|entry| ResolvedMedia {
            reference: format!(
                "data:{};base64,{}",
                entry.mime_type,
                STANDARD.encode(&entry.bytes)
            ),
            kind: entry.kind,
        })
    }

    fn delete_media(&mut self, id: &MediaId) -> Result<(), Error> {
        if !id.is_inline() && self.entries.remove(id).is_some() {
            tracing::debug!(%id, "deleted media");
        }
        Ok(())
    }
}

/// Deletes every stored asset referenced by `question`
///
/// Used after a question was removed from the quiz. Deletion failures are
/// logged and do not stop the remaining deletions.
pub fn release_media(question: &Question, store: &mut impl MediaStore) {
    for attachment in question.media() {
        if let Err(error) = store.delete_media(&attachment.id) {
            tracing::warn!(id = %attachment.id, %error, "failed to delete media");
        }
    }
}
