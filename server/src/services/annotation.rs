//! Annotation service: validation, persistence, and approved-only reads.
//!
//! DESIGN
//! ======
//! Context text is stored exactly as received (percent-encoded). It is
//! decoded here only to reject payloads that would never anchor: malformed
//! escapes or text that is blank once decoded. Readers decode it again at
//! render time.
//!
//! Approval is a column, not a workflow. New rows take the configured
//! default and every read path filters on `approved`, so an unapproved
//! annotation is indistinguishable from a missing one.
//!
//! ERROR HANDLING
//! ==============
//! Database failures surface as [`AnnotationError::Database`]. The route layer
//! logs the underlying error and sends a generic persistence failure so
//! driver messages never reach the client.

#[cfg(test)]
#[path = "annotation_test.rs"]
mod tests;

use anchor::annotation::is_valid_context;
use anchor::{AnnotationId, Author};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;
use wire::{
    AnnotationDetail, AnnotationRecord, CreatedAnnotation, E_INVALID_COMMENT, E_INVALID_CONTEXT, E_NOT_FOUND,
    E_PERSISTENCE_FAILED, ErrorCode,
};

/// Longest comment accepted, in characters.
pub const MAX_COMMENT_CHARS: usize = 10_000;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("context must be non-empty, percent-encoded text")]
    InvalidContext,
    #[error("comment must be between 1 and {MAX_COMMENT_CHARS} characters")]
    InvalidComment,
    #[error("annotation not found: {0}")]
    NotFound(AnnotationId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for AnnotationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidContext => E_INVALID_CONTEXT,
            Self::InvalidComment => E_INVALID_COMMENT,
            Self::NotFound(_) => E_NOT_FOUND,
            Self::Database(_) => E_PERSISTENCE_FAILED,
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Fields of a create request after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnotation {
    /// Encoded context, as received.
    pub context: String,
    pub comment: String,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Check a create payload without touching the database.
///
/// # Errors
///
/// [`AnnotationError::InvalidContext`] when the context does not decode or is
/// blank, [`AnnotationError::InvalidComment`] when the comment is blank or too long.
pub fn validate(context: &str, comment: &str) -> Result<NewAnnotation, AnnotationError> {
    let decoded = wire::decode_context(context).map_err(|_| AnnotationError::InvalidContext)?;
    if !is_valid_context(&decoded) {
        return Err(AnnotationError::InvalidContext);
    }
    if comment.trim().is_empty() || comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(AnnotationError::InvalidComment);
    }
    Ok(NewAnnotation { context: context.to_owned(), comment: comment.to_owned() })
}

/// Author of a row, or the anonymous placeholder when no user is linked.
pub(crate) fn author_from_parts(name: Option<String>, url: Option<String>, avatar: Option<String>) -> Author {
    match name {
        Some(name) if !name.trim().is_empty() => Author { name, url, avatar },
        _ => Author::anonymous(),
    }
}

// =============================================================================
// QUERIES
// =============================================================================

const SELECT_APPROVED: &str = r"SELECT
      a.id,
      a.context_text,
      a.comment_text,
      (EXTRACT(EPOCH FROM a.created_at) * 1000)::BIGINT AS date_ms,
      u.name AS author_name,
      u.url AS author_url,
      u.avatar_url AS author_avatar
  FROM annotations a
  LEFT JOIN users u ON u.id = a.author_id
  WHERE a.approved";

fn record_from_row(row: &PgRow) -> AnnotationRecord {
    AnnotationRecord {
        id: row.get("id"),
        context: row.get("context_text"),
        comment: row.get("comment_text"),
        date: row.get("date_ms"),
        author: author_from_parts(row.get("author_name"), row.get("author_url"), row.get("author_avatar")),
    }
}

/// Insert a validated annotation.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create(
    pool: &PgPool,
    document_id: &str,
    new: NewAnnotation,
    author_id: Uuid,
    approved: bool,
) -> Result<CreatedAnnotation, AnnotationError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO annotations (id, document_id, context_text, comment_text, author_id, approved)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(document_id)
    .bind(&new.context)
    .bind(&new.comment)
    .bind(author_id)
    .bind(approved)
    .execute(pool)
    .await?;

    info!(%id, %document_id, %author_id, approved, "annotation created");
    Ok(CreatedAnnotation { id, context: new.context, comment: new.comment })
}

/// Approved annotations of a document, oldest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_approved(pool: &PgPool, document_id: &str) -> Result<Vec<AnnotationRecord>, AnnotationError> {
    let rows = sqlx::query(&format!("{SELECT_APPROVED} AND a.document_id = $1 ORDER BY a.created_at, a.id"))
        .bind(document_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(record_from_row).collect())
}

/// One approved annotation with its resolved author.
///
/// # Errors
///
/// [`AnnotationError::NotFound`] if the id is unknown or not approved.
pub async fn get_approved(pool: &PgPool, id: AnnotationId) -> Result<AnnotationDetail, AnnotationError> {
    let row = sqlx::query(&format!("{SELECT_APPROVED} AND a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AnnotationError::NotFound(id))?;
    let record = record_from_row(&row);
    Ok(AnnotationDetail { id: record.id, comment: record.comment, date: record.date, author: record.author })
}
