//! Server-side rendering of annotated documents.
//!
//! Runs the anchoring engine over a caller-supplied document body with the
//! document's approved annotations, so pages can be served pre-highlighted
//! and clients without the overlay still see the markers.

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;

use anchor::AnchorOptions;
use sqlx::PgPool;
use tracing::debug;
use wire::{AnnotationRecord, RenderRequest, RenderResponse};

use super::annotation::{self, AnnotationError};

/// Anchor `records` into `request.content`.
#[must_use]
pub fn render(request: &RenderRequest, records: Vec<AnnotationRecord>) -> RenderResponse {
    let options = if request.strict { AnchorOptions::strict() } else { AnchorOptions::default() };
    let annotations: Vec<_> = records
        .into_iter()
        .map(AnnotationRecord::into_annotation)
        .filter(|a| anchor::annotation::is_valid_context(&a.context_text))
        .collect();

    let anchored = anchor::anchor(&request.content, &annotations, &options);
    let content = if request.container { anchor::marker::wrap_container(&anchored.content) } else { anchored.content };
    RenderResponse { content, results: anchored.results }
}

/// Load the approved annotations of `document_id` and render `request` with them.
///
/// # Errors
///
/// Returns a database error if the annotations cannot be loaded.
pub async fn render_document(
    pool: &PgPool,
    document_id: &str,
    request: &RenderRequest,
) -> Result<RenderResponse, AnnotationError> {
    let records = annotation::list_approved(pool, document_id).await?;
    let total = records.len();
    let response = render(request, records);
    let matched = response.results.iter().filter(|r| r.is_matched()).count();
    debug!(%document_id, total, matched, "rendered document");
    Ok(response)
}
