//! Wire model for the annotation network surface.
//!
//! This crate owns the request/response shapes shared by the `server` and the
//! HTTP client adapter in `overlay`. Every response is wrapped in an
//! [`Envelope`]: `{"success": true, "data": ...}` on success or
//! `{"success": false, "error": {"code", "message"}}` on failure.
//!
//! Context text travels percent-encoded ([`encode_context`]) so that it
//! survives form and query transport byte-for-byte; the receiving side
//! decodes it with [`decode_context`], which also accepts the JSON-escaped
//! form older clients produced.

use serde::{Deserialize, Serialize};

pub use anchor::{AnchorResult, Annotation, AnnotationId, Author};

/// Opaque identifier of an annotatable document (post id, slug, path).
pub type DocumentId = String;

// =============================================================================
// ERROR CODES
// =============================================================================

pub const E_NOT_AUTHENTICATED: &str = "E_NOT_AUTHENTICATED";
pub const E_PERSISTENCE_FAILED: &str = "E_PERSISTENCE_FAILED";
pub const E_NOT_FOUND: &str = "E_NOT_FOUND";
pub const E_INVALID_CONTEXT: &str = "E_INVALID_CONTEXT";
pub const E_INVALID_COMMENT: &str = "E_INVALID_COMMENT";
pub const E_MALFORMED_RESPONSE: &str = "E_MALFORMED_RESPONSE";
pub const E_STORE_UNAVAILABLE: &str = "E_STORE_UNAVAILABLE";
pub const E_BAD_REQUEST: &str = "E_BAD_REQUEST";

/// Grepable error code and retryable flag for structured error envelopes.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Error payload of a failed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct WireError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl WireError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), retryable: false }
    }

    #[must_use]
    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

impl<E: ErrorCode> From<&E> for WireError {
    fn from(err: &E) -> Self {
        Self { code: err.error_code().to_owned(), message: err.to_string(), retryable: err.retryable() }
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Response wrapper used by every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(error: WireError) -> Self {
        Self { success: false, data: None, error: Some(error) }
    }

    /// Unwrap into the payload or the error it carries. A success without
    /// data, or a failure without an error, is reported as malformed.
    ///
    /// # Errors
    ///
    /// Returns the envelope's [`WireError`] when `success` is false.
    pub fn into_result(self) -> Result<T, WireError> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (false, _, Some(error)) => Err(error),
            (true, None, _) => Err(WireError::new(E_MALFORMED_RESPONSE, "success without data")),
            (false, _, None) => Err(WireError::new(E_MALFORMED_RESPONSE, "failure without error")),
        }
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Body of the create-annotation action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAnnotationRequest {
    /// Percent-encoded context text.
    pub context: String,
    pub comment: String,
}

impl CreateAnnotationRequest {
    /// Build a request from plain text, encoding the context for transit.
    pub fn new(context_text: &str, comment_text: impl Into<String>) -> Self {
        Self { context: encode_context(context_text), comment: comment_text.into() }
    }
}

/// Payload returned by a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAnnotation {
    pub id: AnnotationId,
    pub context: String,
    pub comment: String,
}

impl CreatedAnnotation {
    /// Decode into an annotation. Author and timestamp are filled in by the caller.
    #[must_use]
    pub fn into_annotation(self) -> Annotation {
        Annotation::new(self.id, decode_context_lossy(&self.context), self.comment)
    }
}

/// One entry of the list-annotations action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: AnnotationId,
    pub context: String,
    pub comment: String,
    /// Milliseconds since the Unix epoch.
    pub date: i64,
    pub author: Author,
}

impl AnnotationRecord {
    #[must_use]
    pub fn into_annotation(self) -> Annotation {
        Annotation::new(self.id, decode_context_lossy(&self.context), self.comment)
            .with_author(self.author)
            .with_created_at(self.date)
    }
}

/// Payload of the get-annotation-detail action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDetail {
    pub id: AnnotationId,
    pub comment: String,
    pub date: i64,
    pub author: Author,
}

/// Body of the server-side render action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub content: String,
    /// Use the stricter fuzzy threshold.
    #[serde(default)]
    pub strict: bool,
    /// Wrap the result in the annotatable container.
    #[serde(default)]
    pub container: bool,
}

/// Payload of the server-side render action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResponse {
    pub content: String,
    pub results: Vec<AnchorResult>,
}

/// The signed-in actor as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: uuid::Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

// =============================================================================
// CONTEXT CODEC
// =============================================================================

/// Error returned by [`decode_context`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The text is not a valid JSON string body.
    #[error("invalid escape sequence: {0}")]
    Escape(#[from] serde_json::Error),
    /// A `%` at this byte offset is not followed by two hex digits.
    #[error("malformed percent escape at byte {0}")]
    Percent(usize),
    /// The percent-decoded bytes are not UTF-8.
    #[error("decoded context is not valid UTF-8")]
    Utf8,
}

/// Encode context text for transit.
#[must_use]
pub fn encode_context(text: &str) -> String {
    anchor::marker::encode_component(text)
}

/// Decode transmitted context text: JSON string unescape, then strict
/// percent-decoding.
///
/// # Errors
///
/// Fails on invalid backslash escapes, raw control characters, malformed
/// `%` escapes, or percent-decoded bytes that are not UTF-8.
pub fn decode_context(raw: &str) -> Result<String, DecodeError> {
    let quoted = format!("\"{}\"", raw.replace('"', "\\\""));
    let unescaped: String = serde_json::from_str(&quoted)?;

    let bytes = unescaped.as_bytes();
    let mut i = 0;
    while let Some(rel) = unescaped[i..].find('%') {
        let at = i + rel;
        let valid = bytes.get(at + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(at + 2).is_some_and(u8::is_ascii_hexdigit);
        if !valid {
            return Err(DecodeError::Percent(at));
        }
        i = at + 3;
    }

    percent_encoding::percent_decode_str(&unescaped)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| DecodeError::Utf8)
}

/// [`decode_context`], falling back to the raw text when it does not decode.
#[must_use]
pub fn decode_context_lossy(raw: &str) -> String {
    match decode_context(raw) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "context did not decode; using raw text");
            raw.to_owned()
        }
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
