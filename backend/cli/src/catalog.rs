//! Discord REST client that overwrites the application's command catalog.
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parley_commands::CommandCatalog;
use parley_core::{CommandDefinition, Snowflake};
use parley_logging::redact_sensitive_data;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct DiscordCatalog {
    base_url: String,
    application_id: Snowflake,
    http: Client,
    bot_token: String,
}

impl DiscordCatalog {
    pub fn new(base_url: &str, application_id: Snowflake, bot_token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            application_id,
            http: Client::new(),
            bot_token,
        }
    }

    /// Bulk-overwrite the commands at `url` and return what the service stored.
    async fn overwrite(
        &self,
        url: String,
        commands: &[CommandDefinition],
        cancel: &CancellationToken,
    ) -> Result<Vec<CommandDefinition>> {
        debug!(%url, count = commands.len(), "Overwriting application commands");
        let request = self
            .http
            .put(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(commands)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!("Registration cancelled"),
            response = request => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "PUT {url} returned {status}: {}",
                redact_sensitive_data(&body)
            ));
        }
        Ok(response.json::<Vec<CommandDefinition>>().await?)
    }
}

#[async_trait]
impl CommandCatalog for DiscordCatalog {
    async fn register_global(
        &self,
        commands: &[CommandDefinition],
        cancel: &CancellationToken,
    ) -> Result<Vec<CommandDefinition>> {
        let url = format!("{}/applications/{}/commands", self.base_url, self.application_id);
        self.overwrite(url, commands, cancel).await
    }

    async fn register_for_scope(
        &self,
        scope: Snowflake,
        commands: &[CommandDefinition],
        cancel: &CancellationToken,
    ) -> Result<Vec<CommandDefinition>> {
        let url = format!(
            "{}/applications/{}/guilds/{}/commands",
            self.base_url, self.application_id, scope
        );
        self.overwrite(url, commands, cancel).await
    }
}

/// Stand-in used when no bot credentials are configured; every call fails.
pub struct UnconfiguredCatalog;

#[async_trait]
impl CommandCatalog for UnconfiguredCatalog {
    async fn register_global(&self, _: &[CommandDefinition], _: &CancellationToken) -> Result<Vec<CommandDefinition>> {
        bail!("Discord bot token and application id are not configured")
    }

    async fn register_for_scope(
        &self,
        _: Snowflake,
        _: &[CommandDefinition],
        _: &CancellationToken,
    ) -> Result<Vec<CommandDefinition>> {
        bail!("Discord bot token and application id are not configured")
    }
}
