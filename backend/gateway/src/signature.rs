//! Signature Gate.
//!
//! Every interaction is signed with the application's ed25519 key over
//! `timestamp || body`. Requests with a missing or invalid signature are
//! answered with `401` and never reach later stages. Verified requests carry
//! an [`InteractionIdentity`] from here on.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use thiserror::Error;
use tracing::debug;

use crate::identity::InteractionIdentity;
use crate::reader::InteractionFeature;
use crate::server::InteractionsGateway;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("public key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("public key must be 32 bytes, got {0}")]
    Length(usize),
    #[error("public key is not a valid ed25519 point")]
    Point,
}

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Parse the hex-encoded public key shown in the application's settings.
    pub fn from_hex(public_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(public_key.trim())?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::Length(bytes.len()))?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::Point)?;
        Ok(Self::new(key))
    }

    /// Check a hex-encoded detached signature over `timestamp || body`.
    pub fn verify(&self, signature: &str, timestamp: &str, body: &[u8]) -> bool {
        let Ok(bytes) = hex::decode(signature) else {
            return false;
        };
        let Ok(bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);
        self.key.verify(&message, &signature).is_ok()
    }

    pub fn verify_headers(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        match (header_str(headers, SIGNATURE_HEADER), header_str(headers, TIMESTAMP_HEADER)) {
            (Some(signature), Some(timestamp)) => self.verify(signature, timestamp, body),
            _ => false,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Second pipeline stage. Only requests the reader claimed are checked.
pub async fn verify_signature(
    State(gateway): State<Arc<InteractionsGateway>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(feature) = req.extensions().get::<Arc<InteractionFeature>>().cloned() else {
        return next.run(req).await;
    };

    if !gateway.verifier().verify_headers(req.headers(), feature.body()) {
        debug!(path = %req.uri().path(), "Rejecting interaction with invalid signature");
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    // bodies that are not interactions still pass through unidentified
    if let Ok(interaction) = feature.interaction() {
        let identity = InteractionIdentity::from_interaction(&interaction);
        req.extensions_mut().insert(Arc::new(identity));
    }
    next.run(req).await
}
