//! Re-anchoring engine for context annotations.
//!
//! An annotation stores only the literal text a reader selected when it was
//! created. Every time the document is rendered again, this crate relocates
//! that text in the new content and wraps it in a highlight marker carrying
//! the annotation id and its comment. The engine is a pure function of
//! `(content, annotations)`: no I/O, no global state, and a pass that matches
//! nothing returns the input unchanged.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | The anchoring pass: ordering, exact and fuzzy search, results |
//! | [`document`] | Segment model of rendered content (raw text vs. markers) |
//! | [`marker`] | Highlight marker markup, comment escaping, container wrapping |
//! | [`similarity`] | Positional (Hamming-style) similarity over code points |
//! | [`annotation`] | The annotation data model shared with the controller and service |
//! | [`consts`] | Thresholds and markup names |

pub mod annotation;
pub mod consts;
pub mod document;
pub mod engine;
pub mod marker;
pub mod similarity;

pub use annotation::{Annotation, AnnotationId, Author};
pub use document::Marker;
pub use engine::{AnchorOptions, AnchorResult, Anchored, MatchKind, anchor, anchor_default, markers, wrap_new};
pub use similarity::similarity;
