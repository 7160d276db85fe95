//! Rectangles, viewport, and popup placement.
//!
//! Rectangles are in viewport (client) coordinates, as reported for a
//! selection range or a highlight element. Detail popups are placed in
//! viewport coordinates; compose popups are placed in page coordinates so
//! they scroll with the selected text.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

use crate::config::OverlayConfig;

/// Axis-aligned bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, right: left + width, bottom: top + height }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Visible window size and scroll position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1024.0, height: 768.0, scroll_x: 0.0, scroll_y: 0.0 }
    }
}

/// How a popup's `left`/`top` are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchoring {
    /// Relative to the viewport.
    Fixed,
    /// Relative to the page.
    Absolute,
}

/// Where a popup goes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub anchoring: Anchoring,
}

/// Place a detail popup to the right of `anchor` when it fits inside the
/// viewport, otherwise to its left, never closer than the minimum edge offset.
#[must_use]
pub fn place_detail(anchor: Rect, viewport: Viewport, config: &OverlayConfig) -> Placement {
    let left = if anchor.right + config.popup_width < viewport.width {
        anchor.right + config.popup_gap
    } else {
        (anchor.left - config.popup_width - config.popup_gap).max(config.min_edge_offset)
    };
    Placement { left, top: anchor.top.max(0.0), anchoring: Anchoring::Fixed }
}

/// Place the compose popup just below the selection, in page coordinates.
#[must_use]
pub fn place_compose(selection: Rect, viewport: Viewport, config: &OverlayConfig) -> Placement {
    Placement {
        left: viewport.scroll_x + selection.left.max(config.min_edge_offset),
        top: viewport.scroll_y + selection.bottom + config.compose_offset,
        anchoring: Anchoring::Absolute,
    }
}
