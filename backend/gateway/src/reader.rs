//! Interaction Reader.
//!
//! Buffers the request body once and exposes it as raw bytes, a JSON tree and
//! a typed [`Interaction`]. The parsed views are computed on first access and
//! memoized for the rest of the request, so every later stage sees the same
//! objects.

use std::sync::Arc;

use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::OnceCell;
use parley_core::Interaction;
use serde_json::Value;
use thiserror::Error;
use tracing::{trace, warn};

use crate::server::InteractionsGateway;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("request has no body")]
    MissingBody,
    #[error("request body is not valid UTF-8")]
    InvalidUtf8,
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("request body is not a valid interaction: {0}")]
    InvalidInteraction(String),
}

/// Per-request views over the buffered body, stored in the request extensions
/// as `Arc<InteractionFeature>`.
#[derive(Debug)]
pub struct InteractionFeature {
    body: Bytes,
    json: OnceCell<Result<Value, ReadError>>,
    interaction: OnceCell<Result<Arc<Interaction>, ReadError>>,
}

impl InteractionFeature {
    pub fn new(body: Bytes) -> Self {
        Self {
            body,
            json: OnceCell::new(),
            interaction: OnceCell::new(),
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Result<&str, ReadError> {
        if self.body.is_empty() {
            return Err(ReadError::MissingBody);
        }
        std::str::from_utf8(&self.body).map_err(|_| ReadError::InvalidUtf8)
    }

    pub fn json(&self) -> Result<&Value, ReadError> {
        self.json
            .get_or_init(|| {
                if self.body.is_empty() {
                    return Err(ReadError::MissingBody);
                }
                trace!(len = self.body.len(), "Parsing interaction body");
                serde_json::from_slice(&self.body).map_err(|e| ReadError::InvalidJson(e.to_string()))
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Typed view. Every call after the first returns the same instance.
    pub fn interaction(&self) -> Result<Arc<Interaction>, ReadError> {
        self.interaction
            .get_or_init(|| {
                let json = self.json()?;
                serde_json::from_value::<Interaction>(json.clone())
                    .map(Arc::new)
                    .map_err(|e| ReadError::InvalidInteraction(e.to_string()))
            })
            .clone()
    }
}

/// Extractor handing the reader's views to handlers behind the gateway.
pub struct ReadInteraction(pub Arc<InteractionFeature>);

#[async_trait]
impl<S> FromRequestParts<S> for ReadInteraction
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<InteractionFeature>>()
            .cloned()
            .map(ReadInteraction)
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Interaction reader is not mounted"))
    }
}

/// First pipeline stage: buffer the body of POSTs to a gateway route.
pub async fn read_interaction(
    State(gateway): State<Arc<InteractionsGateway>>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::POST || !gateway.options().matches_route(req.uri().path()) {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, gateway.options().max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %parts.uri.path(), error = %e, "Failed to read interaction request body");
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    let mut req = Request::from_parts(parts, Body::from(bytes.clone()));
    req.extensions_mut().insert(Arc::new(InteractionFeature::new(bytes)));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::InteractionType;

    #[test]
    fn typed_view_is_memoized() {
        let feature = InteractionFeature::new(Bytes::from_static(br#"{"id":"1","type":1}"#));
        let a = feature.interaction().unwrap();
        let b = feature.interaction().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.kind, InteractionType::Ping);
        assert_eq!(feature.json().unwrap()["type"], 1);

        // parsed at most once: every access sees the same JSON tree
        let first: *const Value = feature.json().unwrap();
        assert!(std::ptr::eq(first, feature.json().unwrap()));
        assert!(feature.json.get().is_some());
        assert!(feature.interaction.get().is_some());
    }

    #[test]
    fn component_and_modal_bodies_are_interactions() {
        let component = InteractionFeature::new(Bytes::from_static(
            br#"{"id":"5","application_id":"2","type":3,"data":{"custom_id":"retry","component_type":2}}"#,
        ));
        let component = component.interaction().unwrap();
        assert_eq!(component.kind, InteractionType::MessageComponent);
        assert_eq!(component.command_id(), None);
        assert_eq!(component.data.as_ref().unwrap().custom_id.as_deref(), Some("retry"));

        let modal = InteractionFeature::new(Bytes::from_static(
            br#"{"id":"6","application_id":"2","type":5,"data":{"custom_id":"feedback","components":[{"type":1,"components":[{"type":4,"custom_id":"text","value":"hi"}]}]}}"#,
        ));
        let modal = modal.interaction().unwrap();
        assert_eq!(modal.kind, InteractionType::ModalSubmit);
        assert_eq!(modal.command_id(), None);
        assert_eq!(modal.data.as_ref().unwrap().components.len(), 1);
    }

    #[test]
    fn empty_body_fails_lazily() {
        let feature = InteractionFeature::new(Bytes::new());
        assert_eq!(feature.body().len(), 0);
        assert_eq!(feature.json().unwrap_err(), ReadError::MissingBody);
        assert_eq!(feature.interaction().unwrap_err(), ReadError::MissingBody);
        assert_eq!(feature.text().unwrap_err(), ReadError::MissingBody);
    }

    #[test]
    fn malformed_body_surfaces_on_access() {
        let feature = InteractionFeature::new(Bytes::from_static(b"{not json"));
        assert_eq!(feature.text().unwrap(), "{not json");
        assert!(matches!(feature.json(), Err(ReadError::InvalidJson(_))));
        assert!(matches!(feature.interaction(), Err(ReadError::InvalidJson(_))));
    }

    #[test]
    fn wrong_shape_is_not_an_interaction() {
        let feature = InteractionFeature::new(Bytes::from_static(br#"{"type":"ping"}"#));
        assert!(feature.json().is_ok());
        assert!(matches!(feature.interaction(), Err(ReadError::InvalidInteraction(_))));
    }
}
