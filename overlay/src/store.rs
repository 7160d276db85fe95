//! Collaborators the controller depends on but does not own.
//!
//! [`CommentStore`] is the persistence seam (async, mockable in tests the way
//! any network client is). [`Identity`] answers who is signed in and where to
//! send someone who is not.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use anchor::AnnotationId;
use anchor::marker::encode_component;
use wire::{AnnotationDetail, AnnotationRecord, CreatedAnnotation, ErrorCode};

/// Failure of a comment store call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("sign-in required")]
    NotAuthenticated,
    #[error("could not save annotation: {0}")]
    PersistenceFailed(String),
    #[error("annotation not found: {0}")]
    NotFound(AnnotationId),
    #[error("comment store unavailable: {0}")]
    Unavailable(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => wire::E_NOT_AUTHENTICATED,
            Self::PersistenceFailed(_) => wire::E_PERSISTENCE_FAILED,
            Self::NotFound(_) => wire::E_NOT_FOUND,
            Self::Unavailable(_) => wire::E_STORE_UNAVAILABLE,
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailed(_) | Self::Unavailable(_))
    }
}

/// Persistence for annotations.
#[async_trait::async_trait]
pub trait CommentStore: Send + Sync {
    /// Persist a new annotation. `context_text` is plain text; adapters encode
    /// it for transit themselves.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotAuthenticated`] when no actor is signed in,
    /// [`StoreError::PersistenceFailed`] when the store rejects or loses it.
    async fn create(
        &self,
        document_id: &str,
        context_text: &str,
        comment_text: &str,
        actor_id: Option<&str>,
    ) -> Result<CreatedAnnotation, StoreError>;

    /// Approved annotations of a document, in creation order.
    ///
    /// # Errors
    ///
    /// Transport failures.
    async fn list_approved(&self, document_id: &str) -> Result<Vec<AnnotationRecord>, StoreError>;

    /// One annotation with its resolved author.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for unknown or unapproved ids.
    async fn get_by_id(&self, id: AnnotationId) -> Result<AnnotationDetail, StoreError>;
}

/// Who is using the page.
pub trait Identity: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn current_actor_id(&self) -> Option<String>;

    /// Sign-in page that returns to `return_to` afterwards.
    fn sign_in_url(&self, return_to: &str) -> String;
}

/// Identity fixed at construction, e.g. from a server-rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    actor_id: Option<String>,
    sign_in_base: String,
}

impl StaticIdentity {
    pub fn new(actor_id: Option<String>, sign_in_base: impl Into<String>) -> Self {
        Self { actor_id, sign_in_base: sign_in_base.into() }
    }

    pub fn anonymous(sign_in_base: impl Into<String>) -> Self {
        Self::new(None, sign_in_base)
    }
}

impl Identity for StaticIdentity {
    fn is_authenticated(&self) -> bool {
        self.actor_id.is_some()
    }

    fn current_actor_id(&self) -> Option<String> {
        self.actor_id.clone()
    }

    fn sign_in_url(&self, return_to: &str) -> String {
        let separator = if self.sign_in_base.contains('?') { '&' } else { '?' };
        format!("{}{separator}redirect_to={}", self.sign_in_base, encode_component(return_to))
    }
}
