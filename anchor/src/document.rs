//! Segment model of rendered content.
//!
//! Content is an ordered sequence of segments. `Raw` segments hold original
//! document text and markup verbatim; `Marker` segments are highlight markers,
//! either found in the input or inserted by the current pass. Searches only
//! look inside `Raw` segments, so text that is already highlighted cannot be
//! matched again, and wrapping a span replaces part of one `Raw` segment with
//! a `Marker`. Rendering a freshly parsed document reproduces the input
//! byte-for-byte.
//!
//! Offsets named `*_start` on segments are code-point offsets into the
//! content the document was parsed from.

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;

use crate::consts::{ATTR_COMMENT, ATTR_COMMENT_ID, MARKER_TAG};
use crate::marker::{attr, close_tag, decode_component, is_marker_tag, open_tag};
use crate::similarity::window_score;

/// A highlight marker and the metadata it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Raw `data-comment-id` value.
    pub id: String,
    /// Decoded comment text.
    pub comment: String,
    /// Wrapped content, verbatim.
    pub text: String,
    /// Code-point offset of `text` in the parsed content.
    pub source_start: usize,
    open_tag: String,
}

impl Marker {
    fn new(id: &str, comment: &str, text: String, source_start: usize) -> Self {
        Self {
            id: id.to_owned(),
            comment: comment.to_owned(),
            text,
            source_start,
            open_tag: open_tag(id, comment),
        }
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(&self.open_tag);
        out.push_str(&self.text);
        out.push_str(&close_tag());
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Raw { text: String, source_start: usize },
    Marker(Marker),
}

/// Location of a candidate span inside a `Raw` segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Hit {
    segment: usize,
    byte_start: usize,
    byte_end: usize,
    /// Code-point offset in the parsed content.
    pub source_start: usize,
    pub similarity: f64,
}

/// Parsed content ready for anchoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    segments: Vec<Segment>,
}

impl Document {
    /// Split `content` into raw text and existing highlight markers.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut segments = Vec::new();
        let open_prefix = format!("<{MARKER_TAG}");
        let mut raw_from = 0usize;
        let mut cursor = 0usize;

        while let Some(rel) = content[cursor..].find(&open_prefix) {
            let tag_start = cursor + rel;
            let Some(tag_len) = content[tag_start..].find('>') else {
                break;
            };
            let tag_end = tag_start + tag_len + 1;
            let tag = &content[tag_start..tag_end];

            let parsed = if is_marker_tag(tag) { find_close(content, tag_end) } else { None };
            let Some((inner_end, close_end)) = parsed else {
                cursor = tag_end;
                continue;
            };

            if raw_from < tag_start {
                segments.push(Segment::Raw {
                    text: content[raw_from..tag_start].to_owned(),
                    source_start: char_offset(content, raw_from),
                });
            }
            segments.push(Segment::Marker(Marker {
                id: attr(tag, ATTR_COMMENT_ID).unwrap_or_default().to_owned(),
                comment: decode_component(attr(tag, ATTR_COMMENT).unwrap_or_default()),
                text: content[tag_end..inner_end].to_owned(),
                source_start: char_offset(content, tag_end),
                open_tag: tag.to_owned(),
            }));
            raw_from = close_end;
            cursor = close_end;
        }

        if raw_from < content.len() {
            segments.push(Segment::Raw {
                text: content[raw_from..].to_owned(),
                source_start: char_offset(content, raw_from),
            });
        }
        Self { segments }
    }

    /// Serialize back to a content string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Raw { text, .. } => out.push_str(text),
                Segment::Marker(marker) => marker.render_into(&mut out),
            }
        }
        out
    }

    /// Markers in document order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Marker(marker) => Some(marker),
            Segment::Raw { .. } => None,
        })
    }

    /// The first marker carrying `id`.
    #[must_use]
    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers().find(|marker| marker.id == id)
    }

    /// First verbatim occurrence of `needle` outside existing markers.
    pub(crate) fn find_exact(&self, needle: &str) -> Option<Hit> {
        if needle.is_empty() {
            return None;
        }
        self.raw_segments().find_map(|(index, text, source_start)| {
            let byte_start = text.find(needle)?;
            Some(Hit {
                segment: index,
                byte_start,
                byte_end: byte_start + needle.len(),
                source_start: source_start + text[..byte_start].chars().count(),
                similarity: 1.0,
            })
        })
    }

    /// Best equal-length window strictly above `threshold`, earliest on ties.
    /// Windows never straddle a marker.
    pub(crate) fn find_fuzzy(&self, needle: &str, threshold: f64) -> Option<Hit> {
        let needle: Vec<char> = needle.chars().collect();
        let n = needle.len();
        if n == 0 {
            return None;
        }

        let mut best: Option<Hit> = None;
        for (index, text, source_start) in self.raw_segments() {
            let indices: Vec<(usize, char)> = text.char_indices().collect();
            if indices.len() < n {
                continue;
            }
            let chars: Vec<char> = indices.iter().map(|&(_, ch)| ch).collect();
            for pos in 0..=chars.len() - n {
                let floor = best.map_or(threshold, |hit| hit.similarity.max(threshold));
                let Some(score) = window_score(&needle, &chars[pos..pos + n], floor) else {
                    continue;
                };
                let byte_end = indices.get(pos + n).map_or(text.len(), |&(byte, _)| byte);
                tracing::trace!(position = source_start + pos, similarity = score, "new best fuzzy window");
                best = Some(Hit {
                    segment: index,
                    byte_start: indices[pos].0,
                    byte_end,
                    source_start: source_start + pos,
                    similarity: score,
                });
            }
        }
        best
    }

    /// Text covered by `hit`.
    pub(crate) fn hit_text(&self, hit: &Hit) -> &str {
        match &self.segments[hit.segment] {
            Segment::Raw { text, .. } => &text[hit.byte_start..hit.byte_end],
            Segment::Marker(marker) => &marker.text,
        }
    }

    /// Replace the span under `hit` with a marker for `id` carrying `comment`.
    pub(crate) fn wrap(&mut self, hit: &Hit, id: &str, comment: &str) {
        let Segment::Raw { text, source_start } = &self.segments[hit.segment] else {
            return;
        };
        let before = &text[..hit.byte_start];
        let inner = &text[hit.byte_start..hit.byte_end];
        let after = &text[hit.byte_end..];

        let mut replacement = Vec::with_capacity(3);
        if !before.is_empty() {
            replacement.push(Segment::Raw { text: before.to_owned(), source_start: *source_start });
        }
        replacement.push(Segment::Marker(Marker::new(id, comment, inner.to_owned(), hit.source_start)));
        if !after.is_empty() {
            replacement.push(Segment::Raw {
                text: after.to_owned(),
                source_start: hit.source_start + inner.chars().count(),
            });
        }
        self.segments.splice(hit.segment..=hit.segment, replacement);
    }

    fn raw_segments(&self) -> impl Iterator<Item = (usize, &str, usize)> {
        self.segments.iter().enumerate().filter_map(|(index, segment)| match segment {
            Segment::Raw { text, source_start } => Some((index, text.as_str(), *source_start)),
            Segment::Marker(_) => None,
        })
    }
}

/// Find the `</span>` closing the marker whose start tag ends at `from`,
/// skipping nested spans. Returns `(inner_end, close_end)` byte offsets.
fn find_close(content: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{MARKER_TAG}");
    let close = close_tag();
    let mut depth = 1usize;
    let mut cursor = from;
    loop {
        let next_close = cursor + content[cursor..].find(&close)?;
        match content[cursor..next_close].find(&open) {
            Some(rel) => {
                depth += 1;
                cursor += rel + open.len();
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Some((next_close, next_close + close.len()));
                }
                cursor = next_close + close.len();
            }
        }
    }
}

fn char_offset(content: &str, byte: usize) -> usize {
    content[..byte].chars().count()
}
