//! Dispatch Middleware: routes application commands to their registered handler.
//!
//! The command id is read from `data.id` of the JSON view. Ids with no cached
//! handler fall through to the surrounding application unchanged.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parley_commands::InvocationContext;
use parley_core::snowflake;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::reader::InteractionFeature;
use crate::server::InteractionsGateway;

pub async fn dispatch_command(
    State(gateway): State<Arc<InteractionsGateway>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(feature) = req.extensions().get::<Arc<InteractionFeature>>().cloned() else {
        return next.run(req).await;
    };

    let command_id = match feature.json() {
        Ok(json) => json.pointer("/data/id").and_then(snowflake::from_value),
        Err(e) => {
            debug!(error = %e, "Interaction body could not be read; passing through");
            None
        }
    };
    let Some(command_id) = command_id else {
        return next.run(req).await;
    };

    gateway.registration_settled().await;

    let interaction = match feature.interaction() {
        Ok(interaction) => interaction,
        Err(e) => {
            debug!(command_id, error = %e, "Interaction body is not a valid interaction; passing through");
            return next.run(req).await;
        }
    };

    let mut scope = gateway.cache().scope(gateway.services().create_scope());
    let handler = match scope.get(command_id) {
        Ok(Some(handler)) => handler,
        Ok(None) => {
            debug!(command_id, "No handler registered for command; passing through");
            drop(scope);
            return next.run(req).await;
        }
        Err(e) => {
            error!(command_id, error = %e, "Failed to resolve command handler");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Command handler unavailable").into_response();
        }
    };

    // cancelled if this future is dropped before the handler finishes
    let cancellation = CancellationToken::new();
    let _guard = cancellation.clone().drop_guard();
    let ctx = InvocationContext::new(scope.services().clone(), cancellation);

    debug!(
        command_id,
        command = interaction.data.as_ref().map(|d| d.name.as_str()).unwrap_or_default(),
        guild_id = interaction.guild_id,
        "Invoking command handler"
    );
    let result = handler.invoke(&interaction, &ctx).await;
    scope.dispose();

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            let reason = format!("{e:#}");
            error!(command_id, error = %reason, "Command handler failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Command handler failed").into_response()
        }
    }
}
