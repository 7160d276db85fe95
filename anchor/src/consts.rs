//! Shared constants for the anchoring engine.

// ── Matching ────────────────────────────────────────────────────

/// Default fuzzy-match threshold. A window must score strictly above this.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Higher-precision threshold for callers that prefer misses over false hits.
pub const STRICT_THRESHOLD: f64 = 0.9;

// ── Markup ──────────────────────────────────────────────────────

/// Class carried by every highlight marker.
pub const HIGHLIGHT_CLASS: &str = "context-highlight";

/// Class of the container `div` that wraps annotatable document bodies.
pub const CONTAINER_CLASS: &str = "context-comments-content";

/// Marker attribute holding the annotation id.
pub const ATTR_COMMENT_ID: &str = "data-comment-id";

/// Marker attribute holding the percent-encoded comment text.
pub const ATTR_COMMENT: &str = "data-comment";

/// Element used for markers.
pub const MARKER_TAG: &str = "span";
