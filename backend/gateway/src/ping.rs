//! Ping Responder: acknowledges heartbeat interactions without touching the application.

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parley_core::InteractionResponse;
use tracing::debug;

use crate::reader::InteractionFeature;

pub async fn respond_to_ping(req: Request, next: Next) -> Response {
    let Some(feature) = req.extensions().get::<Arc<InteractionFeature>>().cloned() else {
        return next.run(req).await;
    };

    match feature.interaction() {
        Ok(interaction) if interaction.is_ping() => {
            debug!(interaction_id = interaction.id, "Responding to ping");
            Json(InteractionResponse::pong()).into_response()
        }
        Ok(_) => next.run(req).await,
        Err(e) => {
            debug!(error = %e, "Interaction body could not be read; passing through");
            next.run(req).await
        }
    }
}
