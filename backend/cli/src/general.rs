//! Built-in "general" command module shipped with the binary.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use parley_commands::{
    BuilderArgs, BuilderRoutine, CommandModule, HandlerDeclaration, InteractionCommandHandler, InvocationContext,
    Lifetime,
};
use parley_core::{CommandDefinition, CommandOption, Interaction, InteractionResponse, OptionType};

pub const MODULE_NAME: &str = "general";

/// Process start time, registered as a singleton service.
#[derive(Debug)]
pub struct Uptime {
    started: Instant,
}

impl Uptime {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn describe(&self) -> String {
        let secs = self.started.elapsed().as_secs();
        format!("{}h {}m {}s", secs / 3600, (secs / 60) % 60, secs % 60)
    }
}

impl Default for Uptime {
    fn default() -> Self {
        Self::new()
    }
}

/// Upper bound on `/say` text, injected into the builder routine.
#[derive(Debug, Clone, Copy)]
pub struct SayLimits {
    pub max_length: usize,
}

impl Default for SayLimits {
    fn default() -> Self {
        Self { max_length: 2000 }
    }
}

// ---------------------------------------------------------------------------
// /ping
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct PingCommand;

#[async_trait]
impl InteractionCommandHandler for PingCommand {
    async fn invoke(&self, _interaction: &Interaction, _ctx: &InvocationContext) -> Result<InteractionResponse> {
        Ok(InteractionResponse::text("Pong!"))
    }
}

// ---------------------------------------------------------------------------
// /say
// ---------------------------------------------------------------------------

pub struct SayCommand {
    limits: SayLimits,
}

impl SayCommand {
    fn definition(args: &BuilderArgs) -> Result<CommandDefinition> {
        let limits = args.get::<SayLimits>()?;
        let text = CommandOption::new(
            OptionType::String,
            "text",
            format!("What to say (up to {} characters)", limits.max_length),
        )?
        .required(true);
        Ok(CommandDefinition::slash("say", "Repeat a message back")?.with_option(text))
    }
}

#[async_trait]
impl InteractionCommandHandler for SayCommand {
    async fn invoke(&self, interaction: &Interaction, _ctx: &InvocationContext) -> Result<InteractionResponse> {
        let text = interaction
            .data
            .as_ref()
            .and_then(|d| d.string_option("text"))
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Ok(InteractionResponse::builder()
                .text("You can't ask me to say nothing!")
                .ephemeral(true)
                .build());
        }
        let text: String = text.chars().take(self.limits.max_length).collect();
        Ok(InteractionResponse::text(text))
    }
}

// ---------------------------------------------------------------------------
// /uptime
// ---------------------------------------------------------------------------

pub struct UptimeCommand {
    uptime: Arc<Uptime>,
}

#[async_trait]
impl InteractionCommandHandler for UptimeCommand {
    async fn invoke(&self, _interaction: &Interaction, _ctx: &InvocationContext) -> Result<InteractionResponse> {
        Ok(InteractionResponse::text(format!("Up for {}", self.uptime.describe())))
    }
}

// ---------------------------------------------------------------------------
// "Inspect" user command
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InspectCommand;

#[async_trait]
impl InteractionCommandHandler for InspectCommand {
    async fn invoke(&self, interaction: &Interaction, _ctx: &InvocationContext) -> Result<InteractionResponse> {
        let target = interaction.data.as_ref().and_then(|d| {
            let id = d.target_id?;
            d.resolved_user(id)
        });
        let text = match target {
            Some(user) => format!(
                "{} ({}) joined Discord as {}{}",
                user.mention(),
                user.id,
                user.username,
                if user.bot { " [bot]" } else { "" }
            ),
            None => "That user could not be resolved.".to_string(),
        };
        Ok(InteractionResponse::builder().text(text).ephemeral(true).build())
    }
}

/// The "general" module: `/ping`, `/say`, `/uptime` and the "Inspect" user command.
pub fn module() -> CommandModule {
    CommandModule::new(MODULE_NAME)
        .declare(
            HandlerDeclaration::of::<PingCommand>()
                .slash("ping", "Check that the bot is responding")
                .lifetime(Lifetime::Singleton),
        )
        .declare(
            HandlerDeclaration::new(|services| {
                let limits = services.get::<SayLimits>().map(|l| *l).unwrap_or_default();
                Ok(SayCommand { limits })
            })
            .builder(BuilderRoutine::sync("definition", SayCommand::definition).param::<SayLimits>()),
        )
        .declare(
            HandlerDeclaration::new(|services| {
                Ok(UptimeCommand {
                    uptime: services.require::<Uptime>()?,
                })
            })
            .slash("uptime", "How long the gateway has been running")
            .lifetime(Lifetime::Scoped),
        )
        .declare(
            HandlerDeclaration::of::<InspectCommand>()
                .user_command("Inspect")
                .lifetime(Lifetime::Scoped),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_commands::{CommandBuilder, ServiceCollection, ServiceProvider};
    use tokio_util::sync::CancellationToken;

    fn services() -> ServiceProvider {
        let mut services = ServiceCollection::new();
        services.add_instance(Arc::new(Uptime::new()));
        services.add_instance(Arc::new(SayLimits { max_length: 5 }));
        services.build()
    }

    fn interaction(data: serde_json::Value) -> Interaction {
        serde_json::from_value(serde_json::json!({
            "id": "1", "application_id": "2", "type": 2, "token": "t", "version": 1, "data": data
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn every_declaration_builds() {
        let builder = CommandBuilder::new(services());
        let cancel = CancellationToken::new();
        let module = module();
        let mut names = Vec::new();
        for declaration in module.declarations() {
            names.push(builder.build(declaration, &cancel).await.unwrap().name().to_string());
        }
        assert_eq!(names, vec!["ping", "say", "uptime", "Inspect"]);
    }

    #[tokio::test]
    async fn say_truncates_and_rejects_blank_text() {
        let services = services();
        let ctx = InvocationContext::new(services.create_scope(), CancellationToken::new());
        let handler = SayCommand {
            limits: *services.require::<SayLimits>().unwrap(),
        };

        let said = handler
            .invoke(
                &interaction(serde_json::json!({
                    "id": "10", "name": "say", "type": 1,
                    "options": [{"name": "text", "type": 3, "value": "hello world"}]
                })),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(said.data.unwrap().content.as_deref(), Some("hello"));

        let blank = handler
            .invoke(&interaction(serde_json::json!({"id": "10", "name": "say", "type": 1})), &ctx)
            .await
            .unwrap();
        assert_eq!(blank.data.unwrap().flags, Some(64));
    }

    #[tokio::test]
    async fn inspect_reads_resolved_target() {
        let ctx = InvocationContext::new(services().create_scope(), CancellationToken::new());
        let response = InspectCommand
            .invoke(
                &interaction(serde_json::json!({
                    "id": "11", "name": "Inspect", "type": 2, "target_id": "42",
                    "resolved": {"users": {"42": {"id": "42", "username": "ferris"}}}
                })),
                &ctx,
            )
            .await
            .unwrap();
        let content = response.data.unwrap().content.unwrap();
        assert!(content.starts_with("<@42>"));
        assert!(content.contains("ferris"));
    }
}
