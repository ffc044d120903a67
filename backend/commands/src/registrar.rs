//! One-shot startup registration of command definitions against the remote catalog.
//!
//! Declarations are split into a global partition and one partition per
//! targeted scope. Each partition is built, bulk-registered (overwrite
//! semantics) and reconciled back to its declarations by [`CommandKey`],
//! because remote ids are only known once registration has returned.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parley_core::{CommandDefinition, CommandType, Snowflake};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::builder::CommandBuilder;
use crate::cache::{CommandHandlerCache, HandlerDescriptor};
use crate::declaration::HandlerDeclaration;
use crate::error::CommandError;
use crate::loader::DeclarationLoader;
use crate::services::ServiceProvider;

/// Reconciliation key: command name compared case-insensitively, plus command type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandKey {
    name: String,
    kind: CommandType,
}

impl CommandKey {
    pub fn new(name: &str, kind: CommandType) -> Self {
        Self {
            name: name.to_lowercase(),
            kind,
        }
    }

    pub fn of(command: &CommandDefinition) -> Self {
        Self::new(command.name(), command.kind())
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// The remote command catalog. Both calls replace the partition's entire
/// remote command set and return the stored commands with their ids.
#[async_trait]
pub trait CommandCatalog: Send + Sync {
    async fn register_global(
        &self,
        commands: &[CommandDefinition],
        cancel: &CancellationToken,
    ) -> Result<Vec<CommandDefinition>>;

    async fn register_for_scope(
        &self,
        scope: Snowflake,
        commands: &[CommandDefinition],
        cancel: &CancellationToken,
    ) -> Result<Vec<CommandDefinition>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Partition {
    Global,
    Scope(Snowflake),
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Global => write!(f, "global"),
            Partition::Scope(id) => write!(f, "guild {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// Number of commands mapped into the handler cache.
    Registered(usize),
    BuildFailed(String),
    RegistrationFailed(String),
    /// Not attempted because registration was cancelled.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub partitions: Vec<(Partition, PartitionOutcome)>,
}

impl RegistrationReport {
    pub fn outcome(&self, partition: Partition) -> Option<&PartitionOutcome> {
        self.partitions.iter().find(|(p, _)| *p == partition).map(|(_, o)| o)
    }

    pub fn registered(&self) -> usize {
        self.partitions
            .iter()
            .map(|(_, o)| match o {
                PartitionOutcome::Registered(n) => *n,
                _ => 0,
            })
            .sum()
    }

    pub fn is_success(&self) -> bool {
        self.partitions
            .iter()
            .all(|(_, o)| matches!(o, PartitionOutcome::Registered(_)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrarState {
    Pending,
    Disabled,
    Loading,
    Partitioning,
    Building(Partition),
    Registering(Partition),
    PopulatingCache(Partition),
    Done,
}

impl RegistrarState {
    pub fn is_done(self) -> bool {
        self == RegistrarState::Done
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrarOptions {
    /// When false, [`CommandsRegistrar::run`] finishes immediately.
    pub enabled: bool,
    /// Module names to load declarations from; empty loads every module.
    pub modules: Vec<String>,
}

pub type PartitionPlan = BTreeMap<Partition, Vec<Arc<HandlerDeclaration>>>;

struct BuiltCommand {
    key: CommandKey,
    definition: CommandDefinition,
    descriptor: Arc<HandlerDescriptor>,
}

pub struct CommandsRegistrar {
    options: RegistrarOptions,
    loader: DeclarationLoader,
    builder: CommandBuilder,
    catalog: Arc<dyn CommandCatalog>,
    cache: Arc<CommandHandlerCache>,
    started: AtomicBool,
    state: watch::Sender<RegistrarState>,
}

impl CommandsRegistrar {
    pub fn new(
        options: RegistrarOptions,
        loader: DeclarationLoader,
        services: ServiceProvider,
        catalog: Arc<dyn CommandCatalog>,
        cache: Arc<CommandHandlerCache>,
    ) -> Self {
        let (state, _) = watch::channel(RegistrarState::Pending);
        Self {
            options,
            loader,
            builder: CommandBuilder::new(services),
            catalog,
            cache,
            started: AtomicBool::new(false),
            state,
        }
    }

    pub fn state(&self) -> RegistrarState {
        *self.state.borrow()
    }

    /// Observe state transitions; the final value is always [`RegistrarState::Done`].
    pub fn subscribe(&self) -> watch::Receiver<RegistrarState> {
        self.state.subscribe()
    }

    pub fn cache(&self) -> &Arc<CommandHandlerCache> {
        &self.cache
    }

    /// Load declarations from the configured modules and split them into partitions.
    ///
    /// The global partition exists only when at least one declaration is global.
    pub fn plan(&self) -> PartitionPlan {
        partition(&self.loader.load(&self.options.modules))
    }

    /// Build every partition without contacting the remote catalog.
    pub async fn preview(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<(Partition, Result<Vec<CommandDefinition>, CommandError>)> {
        let mut out = Vec::new();
        for (partition, declarations) in self.plan() {
            let built = self
                .build_partition(partition, &declarations, cancel)
                .await
                .map(|built| built.into_iter().map(|b| b.definition).collect());
            out.push((partition, built));
        }
        out
    }

    /// Run registration once. A second call fails with [`CommandError::AlreadyRan`].
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RegistrationReport, CommandError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(CommandError::AlreadyRan);
        }

        let mut report = RegistrationReport::default();
        if !self.options.enabled {
            debug!("Registering Discord application commands is disabled");
            self.transition(RegistrarState::Disabled);
            self.transition(RegistrarState::Done);
            return Ok(report);
        }

        info!("Registering Discord application commands");
        self.transition(RegistrarState::Loading);
        let declarations = self.loader.load(&self.options.modules);
        debug!(count = declarations.len(), "Command handler declarations loaded");

        self.transition(RegistrarState::Partitioning);
        for (partition, declarations) in partition(&declarations) {
            let outcome = if cancel.is_cancelled() {
                PartitionOutcome::Skipped
            } else {
                self.register_partition(partition, &declarations, cancel).await
            };
            report.partitions.push((partition, outcome));
        }

        self.transition(RegistrarState::Done);
        info!(
            partitions = report.partitions.len(),
            registered = report.registered(),
            "Discord application command registration finished"
        );
        Ok(report)
    }

    async fn register_partition(
        &self,
        partition: Partition,
        declarations: &[Arc<HandlerDeclaration>],
        cancel: &CancellationToken,
    ) -> PartitionOutcome {
        debug!(%partition, count = declarations.len(), "Registering Discord application commands for partition");

        self.transition(RegistrarState::Building(partition));
        let built = match self.build_partition(partition, declarations, cancel).await {
            Ok(built) => built,
            Err(e) => {
                error!(%partition, error = %e, "Failed building Discord application commands; partition not registered");
                return PartitionOutcome::BuildFailed(e.to_string());
            }
        };

        self.transition(RegistrarState::Registering(partition));
        let definitions: Vec<CommandDefinition> = built.iter().map(|b| b.definition.clone()).collect();
        trace!(%partition, count = definitions.len(), "Sending request to register commands");
        let result = match partition {
            Partition::Global => self.catalog.register_global(&definitions, cancel).await,
            Partition::Scope(scope) => self.catalog.register_for_scope(scope, &definitions, cancel).await,
        };
        let registered = match result {
            Ok(registered) => registered,
            Err(e) => {
                let reason = format!("{e:#}");
                error!(%partition, error = %reason, "Failed registering Discord application commands");
                return PartitionOutcome::RegistrationFailed(reason);
            }
        };

        self.transition(RegistrarState::PopulatingCache(partition));
        let by_key: HashMap<&CommandKey, &Arc<HandlerDescriptor>> =
            built.iter().map(|b| (&b.key, &b.descriptor)).collect();
        let mut mapped = 0;
        for command in &registered {
            let key = CommandKey::of(command);
            let Some(descriptor) = by_key.get(&key) else {
                warn!(%partition, command = %key, "Remote catalog returned a command with no local handler; ignoring");
                continue;
            };
            let Some(id) = command.id() else {
                warn!(%partition, command = %key, "Remote catalog returned a command without an id; ignoring");
                continue;
            };
            self.cache.add_descriptor(id, Arc::clone(descriptor));
            debug!(%partition, name = command.name(), id, "Registered command");
            mapped += 1;
        }
        PartitionOutcome::Registered(mapped)
    }

    async fn build_partition(
        &self,
        partition: Partition,
        declarations: &[Arc<HandlerDeclaration>],
        cancel: &CancellationToken,
    ) -> Result<Vec<BuiltCommand>, CommandError> {
        let mut built: Vec<BuiltCommand> = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            let definition = self.builder.build(declaration, cancel).await?;
            let key = CommandKey::of(&definition);
            if built.iter().any(|b| b.key == key) {
                return Err(CommandError::DuplicateCommand {
                    partition: partition.to_string(),
                    name: definition.name().to_string(),
                    kind: definition.kind(),
                });
            }
            trace!(%partition, name = definition.name(), lifetime = %declaration.resolved_lifetime(), "Built command");
            built.push(BuiltCommand {
                key,
                definition,
                descriptor: Arc::new(HandlerDescriptor::from_declaration(declaration)),
            });
        }
        Ok(built)
    }

    fn transition(&self, state: RegistrarState) {
        self.state.send_replace(state);
    }
}

fn partition(declarations: &[Arc<HandlerDeclaration>]) -> PartitionPlan {
    let mut plan = PartitionPlan::new();
    for declaration in declarations {
        if declaration.is_global() {
            plan.entry(Partition::Global).or_default().push(declaration.clone());
            continue;
        }
        for scope in declaration.target_scopes() {
            plan.entry(Partition::Scope(*scope)).or_default().push(declaration.clone());
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;

    use anyhow::bail;
    use parley_core::{Interaction, InteractionResponse};

    use crate::declaration::{BuilderRoutine, CommandModule};
    use crate::handler::{InteractionCommandHandler, InvocationContext};
    use crate::services::Lifetime;

    #[derive(Default)]
    struct Reply;

    #[async_trait]
    impl InteractionCommandHandler for Reply {
        async fn invoke(&self, _i: &Interaction, _ctx: &InvocationContext) -> Result<InteractionResponse> {
            Ok(InteractionResponse::text("reply"))
        }
    }

    /// Assigns sequential ids; fails for scopes listed in `failing`.
    #[derive(Default)]
    struct FakeCatalog {
        next_id: AtomicU64,
        failing: Vec<Snowflake>,
        calls: Mutex<Vec<(Partition, Vec<String>)>>,
    }

    impl FakeCatalog {
        fn assign(&self, partition: Partition, commands: &[CommandDefinition]) -> Vec<CommandDefinition> {
            self.calls
                .lock()
                .unwrap()
                .push((partition, commands.iter().map(|c| c.name().to_string()).collect()));
            commands
                .iter()
                .map(|c| c.clone().with_id(1000 + self.next_id.fetch_add(1, Ordering::SeqCst)))
                .collect()
        }
    }

    #[async_trait]
    impl CommandCatalog for FakeCatalog {
        async fn register_global(
            &self,
            commands: &[CommandDefinition],
            _cancel: &CancellationToken,
        ) -> Result<Vec<CommandDefinition>> {
            Ok(self.assign(Partition::Global, commands))
        }

        async fn register_for_scope(
            &self,
            scope: Snowflake,
            commands: &[CommandDefinition],
            _cancel: &CancellationToken,
        ) -> Result<Vec<CommandDefinition>> {
            if self.failing.contains(&scope) {
                bail!("403 Missing Access");
            }
            Ok(self.assign(Partition::Scope(scope), commands))
        }
    }

    fn registrar(module: CommandModule, catalog: Arc<FakeCatalog>, enabled: bool) -> CommandsRegistrar {
        CommandsRegistrar::new(
            RegistrarOptions {
                enabled,
                modules: Vec::new(),
            },
            DeclarationLoader::default().with_module(module),
            ServiceProvider::empty(),
            catalog,
            Arc::new(CommandHandlerCache::new()),
        )
    }

    #[tokio::test]
    async fn disabled_registration_short_circuits() {
        let catalog = Arc::new(FakeCatalog::default());
        let module = CommandModule::new("m").declare(HandlerDeclaration::of::<Reply>().slash("ping", "Ping"));
        let registrar = registrar(module, catalog.clone(), false);

        let report = registrar.run(&CancellationToken::new()).await.unwrap();
        assert!(report.partitions.is_empty());
        assert_eq!(registrar.state(), RegistrarState::Done);
        assert!(catalog.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_name_different_type_does_not_collide() {
        let catalog = Arc::new(FakeCatalog::default());
        let module = CommandModule::new("m")
            .declare(HandlerDeclaration::of::<Reply>().slash("inspect", "Inspect something"))
            .declare(HandlerDeclaration::of::<Reply>().user_command("Inspect"));
        let registrar = registrar(module, catalog, true);

        let report = registrar.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.outcome(Partition::Global), Some(&PartitionOutcome::Registered(2)));
        assert_eq!(registrar.cache().len(), 2);
    }

    #[tokio::test]
    async fn multi_scope_declaration_is_registered_per_scope() {
        let catalog = Arc::new(FakeCatalog::default());
        let module = CommandModule::new("m")
            .declare(HandlerDeclaration::of::<Reply>().slash("ping", "Ping"))
            .declare(HandlerDeclaration::of::<Reply>().slash("admin", "Admin only").scopes([10, 20]));
        let registrar = registrar(module, catalog.clone(), true);

        let report = registrar.run(&CancellationToken::new()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.registered(), 3);
        assert_eq!(registrar.cache().len(), 3);

        let calls = catalog.calls.lock().unwrap();
        let partitions: Vec<Partition> = calls.iter().map(|(p, _)| *p).collect();
        assert_eq!(partitions, vec![Partition::Global, Partition::Scope(10), Partition::Scope(20)]);
        assert_eq!(calls[1].1, vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn failing_partition_does_not_stop_others() {
        let catalog = Arc::new(FakeCatalog {
            failing: vec![10],
            ..Default::default()
        });
        let module = CommandModule::new("m")
            .declare(HandlerDeclaration::of::<Reply>().slash("a", "A").scope(10))
            .declare(HandlerDeclaration::of::<Reply>().slash("b", "B").scope(20));
        let registrar = registrar(module, catalog, true);

        let report = registrar.run(&CancellationToken::new()).await.unwrap();
        assert!(matches!(
            report.outcome(Partition::Scope(10)),
            Some(PartitionOutcome::RegistrationFailed(msg)) if msg.contains("Missing Access")
        ));
        assert_eq!(report.outcome(Partition::Scope(20)), Some(&PartitionOutcome::Registered(1)));
        assert!(!report.is_success());
        assert_eq!(registrar.cache().len(), 1);
    }

    #[tokio::test]
    async fn build_failure_skips_whole_partition() {
        let catalog = Arc::new(FakeCatalog::default());
        let module = CommandModule::new("m")
            .declare(HandlerDeclaration::of::<Reply>().slash("good", "Fine"))
            .declare(HandlerDeclaration::of::<Reply>())
            .declare(HandlerDeclaration::of::<Reply>().slash("scoped", "Fine").scope(5));
        let registrar = registrar(module, catalog.clone(), true);

        let report = registrar.run(&CancellationToken::new()).await.unwrap();
        assert!(matches!(report.outcome(Partition::Global), Some(PartitionOutcome::BuildFailed(_))));
        assert_eq!(report.outcome(Partition::Scope(5)), Some(&PartitionOutcome::Registered(1)));
        // the overwrite call is never made with a partial set
        assert!(catalog.calls.lock().unwrap().iter().all(|(p, _)| *p != Partition::Global));
    }

    #[tokio::test]
    async fn duplicate_keys_fail_the_partition() {
        let catalog = Arc::new(FakeCatalog::default());
        let module = CommandModule::new("m")
            .declare(HandlerDeclaration::of::<Reply>().slash("Ping", "Ping"))
            .declare(HandlerDeclaration::of::<Reply>().slash("ping", "Ping again"));
        let registrar = registrar(module, catalog, true);

        let report = registrar.run(&CancellationToken::new()).await.unwrap();
        assert!(matches!(report.outcome(Partition::Global), Some(PartitionOutcome::BuildFailed(msg)) if msg.contains("duplicate")));
    }

    #[tokio::test]
    async fn second_run_is_rejected() {
        let catalog = Arc::new(FakeCatalog::default());
        let registrar = registrar(CommandModule::new("m"), catalog, true);
        let mut state = registrar.subscribe();

        registrar.run(&CancellationToken::new()).await.unwrap();
        assert!(state.wait_for(|s| s.is_done()).await.is_ok());
        assert!(matches!(
            registrar.run(&CancellationToken::new()).await,
            Err(CommandError::AlreadyRan)
        ));
    }

    #[tokio::test]
    async fn cancelled_run_skips_partitions() {
        let catalog = Arc::new(FakeCatalog::default());
        let module = CommandModule::new("m").declare(HandlerDeclaration::of::<Reply>().slash("ping", "Ping"));
        let registrar = registrar(module, catalog, true);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = registrar.run(&cancel).await.unwrap();
        assert_eq!(report.outcome(Partition::Global), Some(&PartitionOutcome::Skipped));
        assert!(registrar.cache().is_empty());
    }

    #[tokio::test]
    async fn preview_builds_without_registering() {
        let catalog = Arc::new(FakeCatalog::default());
        let module = CommandModule::new("m").declare(
            HandlerDeclaration::of::<Reply>()
                .builder(BuilderRoutine::sync("build", |_| Ok(CommandDefinition::message("Quote")?)))
                .lifetime(Lifetime::Singleton),
        );
        let registrar = registrar(module, catalog.clone(), true);

        let preview = registrar.preview(&CancellationToken::new()).await;
        assert_eq!(preview.len(), 1);
        let (partition, built) = &preview[0];
        assert_eq!(*partition, Partition::Global);
        assert_eq!(built.as_ref().unwrap()[0].name(), "Quote");
        assert!(catalog.calls.lock().unwrap().is_empty());
        assert_eq!(registrar.state(), RegistrarState::Pending);
    }
}
