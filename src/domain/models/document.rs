//! Document domain model.
//!
//! Documents are immutable per version. Refinement produces a new value
//! with a bumped version, never a mutation in place.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Metadata attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Human-readable title
    pub title: String,
    /// Detected language, if known
    pub language: Option<String>,
}

/// An opaque text document under review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, stable across versions
    pub id: Uuid,
    /// Full document text
    pub text: String,
    /// Title and language metadata
    pub meta: DocumentMeta,
    /// Version number, starts at 1 and increments per refinement
    pub version: u32,
}

impl Document {
    /// Create a new version-1 document from raw text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            meta: DocumentMeta::default(),
            version: 1,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = title.into();
        self
    }

    /// Set the detected language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.meta.language = Some(language.into());
        self
    }

    /// Produce the next version of this document with replacement text.
    ///
    /// The id and metadata carry over; only text and version change.
    #[must_use]
    pub fn refined(&self, text: impl Into<String>) -> Self {
        Self {
            id: self.id,
            text: text.into(),
            meta: self.meta.clone(),
            version: self.version + 1,
        }
    }

    /// Stable content fingerprint of the document text.
    ///
    /// Used as the persistence namespace key for checkpoint rows, so it must
    /// be identical across processes for identical text.
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.text.as_bytes());
        format!("{hash:x}")
    }

    /// Bounded excerpt of at most `max_chars` characters, cut on a char boundary.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }

    /// Character length of the document text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
