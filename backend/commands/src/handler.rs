//! The contract every interaction command handler implements.

use anyhow::Result;
use async_trait::async_trait;
use parley_core::{Interaction, InteractionResponse};
use tokio_util::sync::CancellationToken;

use crate::services::ServiceProvider;

/// Per-invocation context handed to a handler.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Request-scoped services.
    pub services: ServiceProvider,
    /// Cancelled when the inbound request is dropped.
    pub cancellation: CancellationToken,
}

impl InvocationContext {
    pub fn new(services: ServiceProvider, cancellation: CancellationToken) -> Self {
        Self {
            services,
            cancellation,
        }
    }
}

#[async_trait]
pub trait InteractionCommandHandler: Send + Sync {
    /// Handle one interaction and produce the response written back to the caller.
    async fn invoke(&self, interaction: &Interaction, ctx: &InvocationContext) -> Result<InteractionResponse>;

    /// Resource-release hook, called at most once when the instance is
    /// disposed by the handler cache.
    fn release(&self) {}
}
