//! The anchoring pass.
//!
//! Annotations are processed longest context first (stable on ties), each one
//! searched against the document as already rewritten by the annotations
//! before it. A short annotation whose only occurrence sits inside a longer,
//! already-wrapped span therefore reports `Unmatched`. That is accepted
//! behaviour: anchors are re-derived from text on every render and the next
//! pass may succeed.
//!
//! Exact search is linear in the content length. The fuzzy fallback is
//! `O(content × context)` per annotation, which is fine for the tens of
//! annotations a single document carries.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationId};
use crate::consts::{DEFAULT_THRESHOLD, STRICT_THRESHOLD};
use crate::document::{Document, Marker};

/// Tuning for an anchoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorOptions {
    /// Fuzzy windows must score strictly above this.
    pub threshold: f64,
}

impl AnchorOptions {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Stricter threshold for higher-precision callers.
    #[must_use]
    pub fn strict() -> Self {
        Self { threshold: STRICT_THRESHOLD }
    }
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD }
    }
}

/// How an annotation was relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Fuzzy,
    Unmatched,
}

/// Outcome for one annotation in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorResult {
    pub annotation_id: AnnotationId,
    /// The content text that was wrapped, absent when unmatched.
    pub matched_span: Option<String>,
    pub match_kind: MatchKind,
    /// Code-point offset of the span in the pass's input content.
    pub start_offset: Option<usize>,
    /// `1.0` for exact matches, the window score for fuzzy ones, `0.0` otherwise.
    pub similarity: f64,
}

impl AnchorResult {
    fn unmatched(annotation_id: AnnotationId) -> Self {
        Self { annotation_id, matched_span: None, match_kind: MatchKind::Unmatched, start_offset: None, similarity: 0.0 }
    }

    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.match_kind != MatchKind::Unmatched
    }
}

/// Rewritten content plus one result per input annotation, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchored {
    pub content: String,
    pub results: Vec<AnchorResult>,
}

impl Anchored {
    /// Number of annotations that produced (or already had) a highlight.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_matched()).count()
    }

    #[must_use]
    pub fn result_for(&self, id: AnnotationId) -> Option<&AnchorResult> {
        self.results.iter().find(|r| r.annotation_id == id)
    }
}

/// Wrap every annotation's span in `content` with a highlight marker.
#[must_use]
pub fn anchor(content: &str, annotations: &[Annotation], options: &AnchorOptions) -> Anchored {
    let mut doc = Document::parse(content);

    let mut order: Vec<usize> = (0..annotations.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(annotations[i].context_len()));

    let mut results: Vec<Option<AnchorResult>> = vec![None; annotations.len()];
    for i in order {
        results[i] = Some(anchor_one(&mut doc, &annotations[i], options));
    }

    Anchored {
        content: doc.render(),
        results: results
            .into_iter()
            .zip(annotations)
            .map(|(result, annotation)| result.unwrap_or_else(|| AnchorResult::unmatched(annotation.id)))
            .collect(),
    }
}

/// [`anchor`] with the default threshold.
#[must_use]
pub fn anchor_default(content: &str, annotations: &[Annotation]) -> Anchored {
    anchor(content, annotations, &AnchorOptions::default())
}

/// Anchor a single, newly created annotation into already-rendered content.
#[must_use]
pub fn wrap_new(content: &str, annotation: &Annotation, options: &AnchorOptions) -> Anchored {
    anchor(content, std::slice::from_ref(annotation), options)
}

/// Highlight markers already present in `content`, in document order.
#[must_use]
pub fn markers(content: &str) -> Vec<Marker> {
    Document::parse(content).markers().cloned().collect()
}

fn anchor_one(doc: &mut Document, annotation: &Annotation, options: &AnchorOptions) -> AnchorResult {
    let id = annotation.id.to_string();
    let context = annotation.context_text.as_str();

    if let Some(existing) = doc.marker(&id) {
        tracing::debug!(annotation_id = %annotation.id, "already highlighted");
        return AnchorResult {
            annotation_id: annotation.id,
            matched_span: Some(existing.text.clone()),
            match_kind: MatchKind::Exact,
            start_offset: Some(existing.source_start),
            similarity: 1.0,
        };
    }

    if context.is_empty() {
        tracing::warn!(annotation_id = %annotation.id, "empty context text; skipping");
        return AnchorResult::unmatched(annotation.id);
    }

    let (hit, kind) = if let Some(hit) = doc.find_exact(context) {
        (hit, MatchKind::Exact)
    } else if let Some(hit) = doc.find_fuzzy(context, options.threshold) {
        (hit, MatchKind::Fuzzy)
    } else {
        tracing::debug!(annotation_id = %annotation.id, context_len = annotation.context_len(), "unmatched");
        return AnchorResult::unmatched(annotation.id);
    };

    let span = doc.hit_text(&hit).to_owned();
    doc.wrap(&hit, &id, &annotation.comment_text);
    tracing::debug!(
        annotation_id = %annotation.id,
        kind = ?kind,
        offset = hit.source_start,
        similarity = hit.similarity,
        "anchored"
    );

    AnchorResult {
        annotation_id: annotation.id,
        matched_span: Some(span),
        match_kind: kind,
        start_offset: Some(hit.source_start),
        similarity: hit.similarity,
    }
}
