//! Annotation data model.
//!
//! An annotation is read-only once the comment store has assigned its id.
//! Only `context_text` takes part in anchoring; the author and timestamp are
//! carried along for display.

#[cfg(test)]
#[path = "annotation_test.rs"]
mod annotation_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque annotation identifier assigned by the comment store.
pub type AnnotationId = Uuid;

/// Display name used when an annotation has no resolvable author.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Resolved identity of the person who wrote an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Profile page, if the author has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Avatar image URL, if available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Author {
    /// Placeholder author for annotations whose identity could not be resolved.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { name: ANONYMOUS_NAME.to_owned(), url: None, avatar: None }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS_NAME && self.url.is_none()
    }
}

/// A comment bound to a span of document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    /// The literal text selected at creation time. Never empty.
    pub context_text: String,
    /// Free-form comment. Plain text, never markup.
    pub comment_text: String,
    #[serde(default)]
    pub author: Option<Author>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
}

impl Annotation {
    pub fn new(id: AnnotationId, context_text: impl Into<String>, comment_text: impl Into<String>) -> Self {
        Self {
            id,
            context_text: context_text.into(),
            comment_text: comment_text.into(),
            author: None,
            created_at: 0,
        }
    }

    #[must_use]
    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Length of the context span in Unicode code points.
    #[must_use]
    pub fn context_len(&self) -> usize {
        self.context_text.chars().count()
    }

    /// The author, or the anonymous placeholder.
    #[must_use]
    pub fn author_or_anonymous(&self) -> Author {
        self.author.clone().unwrap_or_else(Author::anonymous)
    }
}

/// Whether `text` is acceptable as an annotation context (non-empty after trimming).
#[must_use]
pub fn is_valid_context(text: &str) -> bool {
    !text.trim().is_empty()
}
