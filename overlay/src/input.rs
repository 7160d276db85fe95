//! Events consumed by the controller.
//!
//! Gestures come from the host's listeners; completions come back from the
//! driver when a store call or timer it started finishes. Completions carry
//! the token or request id they were issued for.

use anchor::AnnotationId;
use serde::{Deserialize, Serialize};
use wire::{AnnotationDetail, AnnotationRecord, CreatedAnnotation};

use crate::geometry::{Rect, Viewport};
use crate::popup::{PopupToken, RequestId, TimerId};
use crate::store::StoreError;

/// A keyboard key, named as the host reports it (`"Escape"`, `"Enter"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.0 == "Escape" || self.0 == "Esc"
    }
}

/// A finished text selection inside the annotatable container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Selected text as reported by the host.
    pub text: String,
    /// Bounding box of the selected range.
    pub rect: Rect,
    /// The gesture ended on an existing highlight.
    #[serde(default)]
    pub on_highlight: bool,
}

/// A highlight element under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightRef {
    pub annotation_id: AnnotationId,
    pub rect: Rect,
}

/// Input to [`Controller::handle`](crate::Controller::handle).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // --- Gestures ---
    Selected(Selection),
    DraftChanged(String),
    Submit,
    Cancel,
    KeyDown(Key),
    HighlightEnter(HighlightRef),
    HighlightLeave(AnnotationId),
    HighlightClick(HighlightRef),
    /// Pointer moved into the open popup.
    PopupEnter,
    /// Click that landed outside both the popup and any highlight.
    OutsideClick,
    ViewportChanged(Viewport),

    // --- Completions ---
    TimerFired(TimerId),
    Loaded(Result<Vec<AnnotationRecord>, StoreError>),
    Created { request: RequestId, result: Result<CreatedAnnotation, StoreError> },
    DetailLoaded { token: PopupToken, result: Result<AnnotationDetail, StoreError> },
}

impl Event {
    /// Short event name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Selected(_) => "selected",
            Self::DraftChanged(_) => "draft_changed",
            Self::Submit => "submit",
            Self::Cancel => "cancel",
            Self::KeyDown(_) => "key_down",
            Self::HighlightEnter(_) => "highlight_enter",
            Self::HighlightLeave(_) => "highlight_leave",
            Self::HighlightClick(_) => "highlight_click",
            Self::PopupEnter => "popup_enter",
            Self::OutsideClick => "outside_click",
            Self::ViewportChanged(_) => "viewport_changed",
            Self::TimerFired(_) => "timer_fired",
            Self::Loaded(_) => "loaded",
            Self::Created { .. } => "created",
            Self::DetailLoaded { .. } => "detail_loaded",
        }
    }
}
