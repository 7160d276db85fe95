//! Per-view configuration.
//!
//! One `OverlayConfig` is built for each annotatable document view and moved
//! into its [`Controller`](crate::Controller). Nothing is read from ambient
//! globals after construction.

use std::time::Duration;

use anchor::AnchorOptions;
use wire::DocumentId;

// ── Timing ──────────────────────────────────────────────────────

/// Hover dwell before a highlight's detail popup opens.
pub const DEFAULT_HOVER_DELAY: Duration = Duration::from_secs(1);

/// Idle time after which a detail popup closes itself.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(10);

// ── Placement ───────────────────────────────────────────────────

/// Popup width in CSS pixels.
pub const POPUP_WIDTH_PX: f64 = 300.0;

/// Gap between a highlight and its detail popup.
pub const POPUP_GAP_PX: f64 = 10.0;

/// Smallest distance a popup keeps from the viewport's left edge.
pub const MIN_EDGE_OFFSET_PX: f64 = 10.0;

/// Vertical offset of the compose popup below the selection.
pub const COMPOSE_OFFSET_PX: f64 = 5.0;

/// Configuration for one controller instance.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Document the annotations belong to.
    pub document_id: DocumentId,
    /// Address of the current page; the sign-in flow returns here.
    pub location: String,
    pub hover_delay: Duration,
    pub dismiss_after: Duration,
    pub anchor: AnchorOptions,
    pub popup_width: f64,
    pub popup_gap: f64,
    pub min_edge_offset: f64,
    pub compose_offset: f64,
}

impl OverlayConfig {
    pub fn new(document_id: impl Into<DocumentId>, location: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            location: location.into(),
            hover_delay: DEFAULT_HOVER_DELAY,
            dismiss_after: DEFAULT_DISMISS_AFTER,
            anchor: AnchorOptions::default(),
            popup_width: POPUP_WIDTH_PX,
            popup_gap: POPUP_GAP_PX,
            min_edge_offset: MIN_EDGE_OFFSET_PX,
            compose_offset: COMPOSE_OFFSET_PX,
        }
    }

    #[must_use]
    pub fn with_hover_delay(mut self, delay: Duration) -> Self {
        self.hover_delay = delay;
        self
    }

    #[must_use]
    pub fn with_dismiss_after(mut self, after: Duration) -> Self {
        self.dismiss_after = after;
        self
    }

    #[must_use]
    pub fn with_anchor_options(mut self, options: AnchorOptions) -> Self {
        self.anchor = options;
        self
    }

    #[must_use]
    pub fn with_popup_width(mut self, width: f64) -> Self {
        self.popup_width = width;
        self
    }
}
