//! [`CommentStore`] over the annotation service's HTTP actions.
//!
//! Every response is a `wire::Envelope`. The error code inside a failed
//! envelope decides the [`StoreError`] variant; the HTTP status is only used
//! for messages, since the envelope is authoritative.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use anchor::AnnotationId;
use anchor::marker::encode_component;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use wire::{AnnotationDetail, AnnotationRecord, CreateAnnotationRequest, CreatedAnnotation, Envelope, WireError};

use crate::store::{CommentStore, StoreError};

/// Failure building the client.
#[derive(Debug, thiserror::Error)]
pub enum HttpStoreError {
    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid session token: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Which store call a failure belongs to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Call {
    Create,
    List,
    Get(AnnotationId),
}

/// Comment store backed by the annotation service.
#[derive(Debug, Clone)]
pub struct HttpCommentStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCommentStore {
    /// Client for `base_url`, authenticating with `session_token` when given.
    ///
    /// # Errors
    ///
    /// Fails if the token is not a valid header value or the TLS backend
    /// cannot be initialised.
    pub fn new(base_url: &str, session_token: Option<&str>) -> Result<Self, HttpStoreError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = session_token {
            headers.insert(COOKIE, HeaderValue::from_str(&format!("session_token={token}"))?);
        }
        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    pub(crate) fn annotations_url(&self, document_id: &str) -> String {
        format!("{}/api/documents/{}/annotations", self.base_url, encode_component(document_id))
    }

    pub(crate) fn annotation_url(&self, id: AnnotationId) -> String {
        format!("{}/api/annotations/{id}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, call: Call) -> Result<T, StoreError> {
        let response = request.send().await.map_err(|e| transport_error(&e.to_string(), call))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(&e.to_string(), call))?;

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(status = status.as_u16(), error = %e, "comment store returned a non-envelope body");
            transport_error(&format!("HTTP {}: unexpected response", status.as_u16()), call)
        })?;
        envelope.into_result().map_err(|err| store_error(&err, call))
    }
}

#[async_trait::async_trait]
impl CommentStore for HttpCommentStore {
    async fn create(
        &self,
        document_id: &str,
        context_text: &str,
        comment_text: &str,
        actor_id: Option<&str>,
    ) -> Result<CreatedAnnotation, StoreError> {
        // The service derives the actor from the session cookie.
        tracing::debug!(document_id, actor_id, "creating annotation");
        let body = CreateAnnotationRequest::new(context_text, comment_text);
        let request = self.client.post(self.annotations_url(document_id)).json(&body);
        self.send(request, Call::Create).await
    }

    async fn list_approved(&self, document_id: &str) -> Result<Vec<AnnotationRecord>, StoreError> {
        let request = self.client.get(self.annotations_url(document_id));
        self.send(request, Call::List).await
    }

    async fn get_by_id(&self, id: AnnotationId) -> Result<AnnotationDetail, StoreError> {
        let request = self.client.get(self.annotation_url(id));
        self.send(request, Call::Get(id)).await
    }
}

/// Translate a failed envelope into the store's taxonomy.
pub(crate) fn store_error(err: &WireError, call: Call) -> StoreError {
    if err.is(wire::E_NOT_AUTHENTICATED) {
        return StoreError::NotAuthenticated;
    }
    match call {
        Call::Create => StoreError::PersistenceFailed(err.message.clone()),
        Call::Get(id) if err.is(wire::E_NOT_FOUND) => StoreError::NotFound(id),
        Call::Get(_) | Call::List => StoreError::Unavailable(err.to_string()),
    }
}

fn transport_error(message: &str, call: Call) -> StoreError {
    match call {
        Call::Create => StoreError::PersistenceFailed(message.to_owned()),
        Call::List | Call::Get(_) => StoreError::Unavailable(message.to_owned()),
    }
}
