//! Highlight marker markup.
//!
//! A marker is a `span` with the highlight class, the annotation id, and the
//! percent-encoded comment as attributes. The comment is encoded with the
//! same character set as a browser's `encodeURIComponent`, so the value never
//! contains a quote or angle bracket and can sit inside an attribute as-is.

#[cfg(test)]
#[path = "marker_test.rs"]
mod marker_test;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::consts::{ATTR_COMMENT, ATTR_COMMENT_ID, CONTAINER_CLASS, HIGHLIGHT_CLASS, MARKER_TAG};

/// Characters escaped by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode text the way `encodeURIComponent` does. Used for marker
/// metadata and for context text in transit.
#[must_use]
pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Reverse [`encode_component`]. Malformed escapes are kept literally and
/// invalid UTF-8 is replaced.
#[must_use]
pub fn decode_component(encoded: &str) -> String {
    percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}

/// Build the opening tag of a marker for `id` carrying `comment`.
#[must_use]
pub fn open_tag(id: &str, comment: &str) -> String {
    format!(
        r#"<{MARKER_TAG} class="{HIGHLIGHT_CLASS}" {ATTR_COMMENT_ID}="{}" {ATTR_COMMENT}="{}">"#,
        escape_html(id),
        encode_component(comment)
    )
}

/// Closing tag matching [`open_tag`].
#[must_use]
pub fn close_tag() -> String {
    format!("</{MARKER_TAG}>")
}

/// Escape text for safe inclusion in markup.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wrap a document body in the annotatable container. Already-wrapped
/// content is returned unchanged.
#[must_use]
pub fn wrap_container(content: &str) -> String {
    let open = format!(r#"<div class="{CONTAINER_CLASS}">"#);
    if content.starts_with(&open) && content.ends_with("</div>") {
        return content.to_owned();
    }
    format!("{open}{content}</div>")
}

/// Value of attribute `name` inside a single start tag, if present.
pub(crate) fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {name}=\"");
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

/// Whether a start tag is a highlight marker.
pub(crate) fn is_marker_tag(tag: &str) -> bool {
    attr(tag, "class").is_some_and(|classes| classes.split_whitespace().any(|c| c == HIGHLIGHT_CLASS))
}
