//! Turns a handler declaration into a command definition.

use std::any::TypeId;
use std::sync::Arc;

use parley_core::CommandDefinition;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::declaration::{BuilderArgs, BuilderRoutine, HandlerDeclaration, ParameterSpec, Receiver};
use crate::error::CommandError;
use crate::services::{ServiceProvider, ServiceRef};

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    services: ServiceProvider,
}

impl CommandBuilder {
    pub fn new(services: ServiceProvider) -> Self {
        Self { services }
    }

    /// Build the definition for `declaration`.
    ///
    /// A builder routine, when declared, always wins over static metadata.
    pub async fn build(
        &self,
        declaration: &HandlerDeclaration,
        cancellation: &CancellationToken,
    ) -> Result<CommandDefinition, CommandError> {
        let handler = declaration.type_name();

        let routine = match declaration.builder_routines() {
            [] => None,
            [routine] => Some(routine),
            many => {
                return Err(CommandError::AmbiguousBuilder {
                    handler,
                    count: many.len(),
                })
            }
        };

        let Some(routine) = routine else {
            let Some(meta) = declaration.static_metadata() else {
                return Err(CommandError::MissingMetadata { handler });
            };
            trace!(handler, name = %meta.name, "Building command from static metadata");
            return CommandDefinition::new(
                meta.kind,
                meta.name.clone(),
                meta.description.clone(),
                meta.enabled_by_default,
            )
            .map_err(|source| CommandError::InvalidDefinition { handler, source });
        };

        if routine.receiver() != Receiver::Static {
            return Err(CommandError::NonStaticBuilder {
                handler,
                routine: routine.name(),
            });
        }
        if routine.output().type_id != TypeId::of::<CommandDefinition>() {
            return Err(CommandError::InvalidReturnType {
                handler,
                routine: routine.name(),
                found: routine.output().type_name,
            });
        }

        let args = self.resolve_args(handler, routine, cancellation)?;
        trace!(handler, routine = routine.name(), is_async = routine.is_async(), "Invoking builder routine");
        let output = routine.call(args).await.map_err(|e| CommandError::BuilderFailed {
            handler,
            message: format!("{e:#}"),
        })?;

        output
            .downcast::<CommandDefinition>()
            .map(|boxed| *boxed)
            .map_err(|_| CommandError::InvalidReturnType {
                handler,
                routine: routine.name(),
                found: routine.output().type_name,
            })
    }

    /// Resolve each declared parameter: container lookup first, then the
    /// container itself, then the cancellation token.
    fn resolve_args(
        &self,
        handler: &'static str,
        routine: &BuilderRoutine,
        cancellation: &CancellationToken,
    ) -> Result<BuilderArgs, CommandError> {
        let mut values = Vec::with_capacity(routine.params().len());
        for param in routine.params() {
            let value = self
                .resolve_param(param, cancellation)
                .map_err(|e| CommandError::ParameterResolution {
                    handler,
                    routine: routine.name(),
                    parameter: param.type_name,
                    message: format!("{e:#}"),
                })?
                .ok_or(CommandError::UnresolvedParameter {
                    handler,
                    routine: routine.name(),
                    parameter: param.type_name,
                })?;
            values.push((param.type_id, value));
        }
        Ok(BuilderArgs::new(values, cancellation.clone()))
    }

    /// `Err` means the parameter is registered but its factory failed.
    fn resolve_param(
        &self,
        param: &ParameterSpec,
        cancellation: &CancellationToken,
    ) -> anyhow::Result<Option<ServiceRef>> {
        if let Some(service) = self.services.resolve(param.type_id)? {
            return Ok(Some(service));
        }
        if param.type_id == TypeId::of::<ServiceProvider>() {
            return Ok(Some(Arc::new(self.services.clone())));
        }
        if param.type_id == TypeId::of::<CancellationToken>() {
            return Ok(Some(Arc::new(cancellation.clone())));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use parley_core::{CommandOption, CommandType, Interaction, InteractionResponse, OptionType};

    use crate::handler::{InteractionCommandHandler, InvocationContext};
    use crate::services::ServiceCollection;

    #[derive(Default)]
    struct Echo;

    #[async_trait]
    impl InteractionCommandHandler for Echo {
        async fn invoke(&self, _i: &Interaction, _ctx: &InvocationContext) -> Result<InteractionResponse> {
            Ok(InteractionResponse::text("echo"))
        }
    }

    struct Prefix(&'static str);

    fn builder() -> CommandBuilder {
        let mut services = ServiceCollection::new();
        services.add_singleton(|_| Ok(Prefix("fancy")));
        CommandBuilder::new(services.build())
    }

    async fn build(decl: HandlerDeclaration) -> Result<CommandDefinition, CommandError> {
        builder().build(&decl, &CancellationToken::new()).await
    }

    #[tokio::test]
    async fn builds_from_static_metadata() {
        let cmd = build(HandlerDeclaration::of::<Echo>().slash("ping", "Pings me!")).await.unwrap();
        assert_eq!(cmd.name(), "ping");
        assert_eq!(cmd.description(), Some("Pings me!"));
        assert_eq!(cmd.kind(), CommandType::ChatInput);
    }

    #[tokio::test]
    async fn sync_builder_wins_over_metadata() {
        let decl = HandlerDeclaration::of::<Echo>()
            .slash("from-meta", "Metadata")
            .builder(BuilderRoutine::sync("build", |_| {
                Ok(CommandDefinition::slash("from-builder", "Builder")?)
            }));
        assert_eq!(build(decl).await.unwrap().name(), "from-builder");
    }

    #[tokio::test]
    async fn async_builder_with_injected_params() {
        let decl = HandlerDeclaration::of::<Echo>().builder(
            BuilderRoutine::future("build", |args: BuilderArgs| async move {
                let prefix = args.get::<Prefix>()?;
                let services = args.get::<ServiceProvider>()?;
                let token = args.get::<CancellationToken>()?;
                assert!(!token.is_cancelled());
                assert!(services.get::<Prefix>().is_some());
                let cmd = CommandDefinition::slash(format!("{}-say", prefix.0), "Make me say something!")?
                    .with_option(CommandOption::new(OptionType::String, "text", "What to say")?.required(true));
                Ok::<_, anyhow::Error>(cmd)
            })
            .param::<Prefix>()
            .param::<ServiceProvider>()
            .param::<CancellationToken>(),
        );
        let cmd = build(decl).await.unwrap();
        assert_eq!(cmd.name(), "fancy-say");
        assert_eq!(cmd.options.len(), 1);
    }

    #[tokio::test]
    async fn two_builders_are_ambiguous() {
        let routine = BuilderRoutine::sync("build", |_| Ok(CommandDefinition::user("Inspect")?));
        let decl = HandlerDeclaration::of::<Echo>().builder(routine.clone()).builder(routine);
        assert!(matches!(build(decl).await, Err(CommandError::AmbiguousBuilder { count: 2, .. })));
    }

    #[tokio::test]
    async fn non_command_return_type_fails() {
        let decl = HandlerDeclaration::of::<Echo>().builder(BuilderRoutine::sync("build", |_| Ok("ping".to_string())));
        assert!(matches!(build(decl).await, Err(CommandError::InvalidReturnType { .. })));
    }

    #[tokio::test]
    async fn instance_builder_fails() {
        let decl = HandlerDeclaration::of::<Echo>()
            .builder(BuilderRoutine::sync("build", |_| Ok(CommandDefinition::user("Inspect")?)).on_instance());
        assert!(matches!(build(decl).await, Err(CommandError::NonStaticBuilder { .. })));
    }

    #[tokio::test]
    async fn unresolved_parameter_names_the_type() {
        struct Unregistered;
        let decl = HandlerDeclaration::of::<Echo>().builder(
            BuilderRoutine::sync("build", |_| Ok(CommandDefinition::user("Inspect")?)).param::<Unregistered>(),
        );
        let err = build(decl).await.unwrap_err();
        assert!(err.to_string().contains("Unregistered"), "{err}");
    }

    #[tokio::test]
    async fn failing_service_factory_is_not_reported_as_unsupported() {
        struct Database;
        let mut services = ServiceCollection::new();
        services.add_singleton::<Database, _>(|_| Err(anyhow::anyhow!("connection refused")));
        let builder = CommandBuilder::new(services.build());

        let decl = HandlerDeclaration::of::<Echo>().builder(
            BuilderRoutine::sync("build", |_| Ok(CommandDefinition::user("Inspect")?)).param::<Database>(),
        );
        let err = builder.build(&decl, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::ParameterResolution { .. }), "{err}");
        assert!(err.to_string().contains("connection refused"), "{err}");
        assert!(err.to_string().contains("Database"), "{err}");
    }

    #[tokio::test]
    async fn neither_builder_nor_metadata_fails() {
        let decl = HandlerDeclaration::of::<Echo>();
        assert!(matches!(build(decl).await, Err(CommandError::MissingMetadata { .. })));
    }

    #[tokio::test]
    async fn invalid_metadata_is_reported() {
        let decl = HandlerDeclaration::of::<Echo>().slash("ping", "");
        assert!(matches!(build(decl).await, Err(CommandError::InvalidDefinition { .. })));
    }
}
