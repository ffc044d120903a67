//! `parley-gateway`: Axum middleware pipeline for signed interaction webhooks.

pub mod dispatch;
pub mod identity;
pub mod ping;
pub mod reader;
pub mod server;
pub mod signature;

pub use identity::{InteractionIdentity, VerifiedInteraction};
pub use reader::{InteractionFeature, ReadError, ReadInteraction};
pub use server::{start_server, GatewayOptions, InteractionsGateway, DEFAULT_MAX_BODY_BYTES, DEFAULT_ROUTE};
pub use signature::{KeyError, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
