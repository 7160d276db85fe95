//! The single popup slot and what can occupy it.
//!
//! Every popup that is opened gets a fresh [`PopupToken`]. Completions and
//! timers carry the token (or [`TimerId`]) they were issued for and are
//! dropped when it no longer names the current occupant, so a late detail
//! response or dismiss timer can never act on a popup that replaced theirs.

#[cfg(test)]
#[path = "popup_test.rs"]
mod popup_test;

use std::fmt;

use anchor::marker::escape_html;
use anchor::{Annotation, AnnotationId, Author};
use serde::Serialize;
use wire::AnnotationDetail;

use crate::geometry::Rect;
use crate::input::Selection;

/// Identity of one opened popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PopupToken(pub u64);

/// Identity of one started timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub u64);

/// Identity of one in-flight create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for PopupToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "popup#{}", self.0)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// Current occupant of the popup slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PopupState {
    #[default]
    Idle,
    /// Compose popup open for a selection.
    Composing { token: PopupToken, selection: Selection, draft: String },
    /// Detail requested for a highlight; nothing visible yet.
    DetailPending { token: PopupToken, annotation_id: AnnotationId, anchor: Rect },
    /// Detail popup visible, closing itself when `dismiss` fires.
    DetailShown { token: PopupToken, annotation_id: AnnotationId, dismiss: TimerId },
}

impl PopupState {
    #[must_use]
    pub fn token(&self) -> Option<PopupToken> {
        match self {
            Self::Idle => None,
            Self::Composing { token, .. } | Self::DetailPending { token, .. } | Self::DetailShown { token, .. } => {
                Some(*token)
            }
        }
    }

    /// Whether a popup element is on screen.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Composing { .. } | Self::DetailShown { .. })
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Short state name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Composing { .. } => "composing",
            Self::DetailPending { .. } => "detail_pending",
            Self::DetailShown { .. } => "detail_shown",
        }
    }
}

/// What the surface should draw inside a popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PopupView {
    Compose(ComposeView),
    Detail(DetailView),
}

/// Compose form for a new annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeView {
    /// The selected text the annotation will attach to.
    pub context_text: String,
    /// Pre-filled comment text (non-empty only when reopening after a failure).
    pub draft: String,
    /// Failure message to show above the form.
    pub error: Option<String>,
}

/// Read-only view of one annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub annotation_id: AnnotationId,
    /// Comment text, escaped for insertion as markup.
    pub comment_html: String,
    pub author: Author,
    /// Milliseconds since the Unix epoch, when known.
    pub created_at: Option<i64>,
    /// Built from local marker metadata after the store could not be reached.
    pub from_fallback: bool,
}

impl DetailView {
    #[must_use]
    pub fn from_detail(detail: AnnotationDetail) -> Self {
        Self {
            annotation_id: detail.id,
            comment_html: escape_html(&detail.comment),
            author: detail.author,
            created_at: Some(detail.date),
            from_fallback: false,
        }
    }

    /// Local view with an anonymous author.
    #[must_use]
    pub fn fallback(annotation_id: AnnotationId, comment: &str) -> Self {
        Self {
            annotation_id,
            comment_html: escape_html(comment),
            author: Author::anonymous(),
            created_at: None,
            from_fallback: true,
        }
    }

    #[must_use]
    pub fn from_annotation(annotation: &Annotation) -> Self {
        Self {
            annotation_id: annotation.id,
            comment_html: escape_html(&annotation.comment_text),
            author: annotation.author_or_anonymous(),
            created_at: (annotation.created_at > 0).then_some(annotation.created_at),
            from_fallback: true,
        }
    }

    /// Age label relative to `now_ms`, if the creation time is known.
    #[must_use]
    pub fn age_label(&self, now_ms: i64) -> Option<String> {
        self.created_at.map(|created| relative_time(created, now_ms))
    }

    /// `"ada, 2 hours ago"`. Anonymous authors are left out of the line.
    #[must_use]
    pub fn byline(&self, now_ms: i64) -> Option<String> {
        let age = self.age_label(now_ms);
        if self.author.is_anonymous() {
            return age;
        }
        Some(match age {
            Some(age) => format!("{}, {age}", self.author.name),
            None => self.author.name.clone(),
        })
    }
}

/// Coarse "time ago" label.
#[must_use]
pub fn relative_time(then_ms: i64, now_ms: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let secs = now_ms.saturating_sub(then_ms).max(0) / 1000;
    let (n, unit) = match secs {
        s if s < MINUTE => return "just now".to_owned(),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < MONTH => (s / DAY, "day"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };
    if n == 1 { format!("1 {unit} ago") } else { format!("{n} {unit}s ago") }
}
