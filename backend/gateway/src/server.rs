//! Gateway state, route mounting and the HTTP server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{middleware, Router};
use parley_commands::{CommandHandlerCache, RegistrarState, ServiceProvider};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::dispatch::dispatch_command;
use crate::ping::respond_to_ping;
use crate::reader::read_interaction;
use crate::signature::{verify_signature, SignatureVerifier};

pub const DEFAULT_ROUTE: &str = "/api/discord/interactions";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Paths the pipeline handles, compared case-insensitively. Empty means every POST.
    pub routes: Vec<String>,
    /// Answer pings in the gateway instead of delivering them to the application.
    pub handle_pings: bool,
    /// Hold command dispatch until the registrar has finished.
    pub await_registration: bool,
    pub max_body_bytes: usize,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            routes: vec![DEFAULT_ROUTE.to_string()],
            handle_pings: true,
            await_registration: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl GatewayOptions {
    pub fn matches_route(&self, path: &str) -> bool {
        self.routes.is_empty() || self.routes.iter().any(|r| r.eq_ignore_ascii_case(path))
    }
}

/// Shared state of the interaction pipeline.
pub struct InteractionsGateway {
    options: GatewayOptions,
    verifier: SignatureVerifier,
    cache: Arc<CommandHandlerCache>,
    services: ServiceProvider,
    registration: Option<watch::Receiver<RegistrarState>>,
}

impl InteractionsGateway {
    pub fn new(
        options: GatewayOptions,
        verifier: SignatureVerifier,
        cache: Arc<CommandHandlerCache>,
        services: ServiceProvider,
    ) -> Self {
        Self {
            options,
            verifier,
            cache,
            services,
            registration: None,
        }
    }

    /// Registrar progress, consulted when `await_registration` is set.
    pub fn with_registration(mut self, registration: watch::Receiver<RegistrarState>) -> Self {
        self.registration = Some(registration);
        self
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub fn cache(&self) -> &Arc<CommandHandlerCache> {
        &self.cache
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }

    /// Resolves once registration is done, or immediately when not awaiting it.
    pub async fn registration_settled(&self) {
        if !self.options.await_registration {
            return;
        }
        let Some(mut registration) = self.registration.clone() else {
            return;
        };
        if !registration.borrow().is_done() {
            debug!("Waiting for command registration to finish");
        }
        // a dropped registrar can no longer populate the cache
        let _ = registration.wait_for(|state| state.is_done()).await;
    }

    /// Wrap `app` with the interaction pipeline:
    /// reader, signature gate, ping responder (optional), dispatch.
    pub fn mount(self, app: Router) -> Router {
        let handle_pings = self.options.handle_pings;
        let state = Arc::new(self);

        let mut app = app.layer(middleware::from_fn_with_state(state.clone(), dispatch_command));
        if handle_pings {
            app = app.layer(middleware::from_fn(respond_to_ping));
        }
        app.layer(middleware::from_fn_with_state(state.clone(), verify_signature))
            .layer(middleware::from_fn_with_state(state, read_interaction))
    }
}

/// Serve `app` until `shutdown` is cancelled.
#[instrument(skip(app, shutdown))]
pub async fn start_server(addr: SocketAddr, app: Router, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Interactions gateway listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Interactions gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_match_case_insensitively() {
        let options = GatewayOptions::default();
        assert!(options.matches_route("/api/discord/interactions"));
        assert!(options.matches_route("/API/Discord/Interactions"));
        assert!(!options.matches_route("/api/discord"));

        let everything = GatewayOptions {
            routes: Vec::new(),
            ..Default::default()
        };
        assert!(everything.matches_route("/anything"));
    }
}
