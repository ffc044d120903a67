//! Handler declarations.
//!
//! A declaration is the code-level description of one command: how to build
//! its [`CommandDefinition`] (static metadata or a builder routine), which
//! scopes it targets, which lifetime its instances have, and how to construct
//! a handler instance. Declarations are registered explicitly and grouped
//! into named [`CommandModule`]s.

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::{BoxFuture, FutureExt};
use parley_core::{CommandDefinition, CommandType, Snowflake};
use tokio_util::sync::CancellationToken;

use crate::handler::InteractionCommandHandler;
use crate::services::{Lifetime, ServiceProvider, ServiceRef};

pub type HandlerFactory =
    Arc<dyn Fn(&ServiceProvider) -> Result<Arc<dyn InteractionCommandHandler>> + Send + Sync>;

type BuilderFn = Arc<dyn Fn(BuilderArgs) -> BoxFuture<'static, Result<Box<dyn Any + Send>>> + Send + Sync>;

// ---------------------------------------------------------------------------
// Static metadata
// ---------------------------------------------------------------------------

/// Name/description attached directly to a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    pub kind: CommandType,
    pub name: String,
    pub description: Option<String>,
    pub enabled_by_default: bool,
}

// ---------------------------------------------------------------------------
// Builder routines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    Static,
    Instance,
}

/// A declared parameter of a builder routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl ParameterSpec {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Arguments resolved for a builder routine invocation.
pub struct BuilderArgs {
    values: Vec<(TypeId, ServiceRef)>,
    cancellation: CancellationToken,
}

impl BuilderArgs {
    pub(crate) fn new(values: Vec<(TypeId, ServiceRef)>, cancellation: CancellationToken) -> Self {
        Self {
            values,
            cancellation,
        }
    }

    /// Fetch the resolved argument of type `T`. Only declared parameters are available.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let (_, value) = self
            .values
            .iter()
            .find(|(id, _)| *id == TypeId::of::<T>())
            .ok_or_else(|| anyhow!("parameter {} was not declared", std::any::type_name::<T>()))?;
        value
            .clone()
            .downcast::<T>()
            .map_err(|_| anyhow!("parameter {} resolved to another type", std::any::type_name::<T>()))
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// A designated routine that produces a command definition for a declaration.
#[derive(Clone)]
pub struct BuilderRoutine {
    name: &'static str,
    receiver: Receiver,
    is_async: bool,
    output: ParameterSpec,
    params: Vec<ParameterSpec>,
    invoke: BuilderFn,
}

impl BuilderRoutine {
    /// Synchronous routine returning `R`.
    pub fn sync<R, F>(name: &'static str, f: F) -> Self
    where
        R: Any + Send,
        F: Fn(&BuilderArgs) -> Result<R> + Send + Sync + 'static,
    {
        let invoke: BuilderFn = Arc::new(move |args| {
            let out = f(&args).map(|r| Box::new(r) as Box<dyn Any + Send>);
            async move { out }.boxed()
        });
        Self {
            name,
            receiver: Receiver::Static,
            is_async: false,
            output: ParameterSpec::of::<R>(),
            params: Vec::new(),
            invoke,
        }
    }

    /// Asynchronous routine resolving to `R`.
    pub fn future<R, F, Fut>(name: &'static str, f: F) -> Self
    where
        R: Any + Send,
        F: Fn(BuilderArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let invoke: BuilderFn = Arc::new(move |args| {
            let fut = f(args);
            async move { fut.await.map(|r| Box::new(r) as Box<dyn Any + Send>) }.boxed()
        });
        Self {
            name,
            receiver: Receiver::Static,
            is_async: true,
            output: ParameterSpec::of::<R>(),
            params: Vec::new(),
            invoke,
        }
    }

    /// Declare a parameter to be resolved before invocation.
    pub fn param<T: Any>(mut self) -> Self {
        self.params.push(ParameterSpec::of::<T>());
        self
    }

    /// Mark the routine as requiring a handler instance.
    pub fn on_instance(mut self) -> Self {
        self.receiver = Receiver::Instance;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn output(&self) -> ParameterSpec {
        self.output
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub(crate) fn call(&self, args: BuilderArgs) -> BoxFuture<'static, Result<Box<dyn Any + Send>>> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for BuilderRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderRoutine")
            .field("name", &self.name)
            .field("receiver", &self.receiver)
            .field("is_async", &self.is_async)
            .field("output", &self.output.type_name)
            .field("params", &self.params.iter().map(|p| p.type_name).collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Declaration
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HandlerDeclaration {
    type_name: &'static str,
    metadata: Option<CommandMetadata>,
    builders: Vec<BuilderRoutine>,
    scopes: BTreeSet<Snowflake>,
    lifetime: Option<Lifetime>,
    factory: HandlerFactory,
}

impl HandlerDeclaration {
    /// Declare handler type `H`, constructed by `factory`.
    pub fn new<H, F>(factory: F) -> Self
    where
        H: InteractionCommandHandler + 'static,
        F: Fn(&ServiceProvider) -> Result<H> + Send + Sync + 'static,
    {
        let factory: HandlerFactory = Arc::new(move |services| {
            factory(services).map(|h| Arc::new(h) as Arc<dyn InteractionCommandHandler>)
        });
        Self {
            type_name: std::any::type_name::<H>(),
            metadata: None,
            builders: Vec::new(),
            scopes: BTreeSet::new(),
            lifetime: None,
            factory,
        }
    }

    /// Declare a handler type that needs no dependencies.
    pub fn of<H>() -> Self
    where
        H: InteractionCommandHandler + Default + 'static,
    {
        Self::new(|_| Ok(H::default()))
    }

    /// Static metadata for a chat-input (slash) command.
    pub fn slash(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.metadata(CommandType::ChatInput, name, Some(description.into()))
    }

    pub fn user_command(self, name: impl Into<String>) -> Self {
        self.metadata(CommandType::User, name, None)
    }

    pub fn message_command(self, name: impl Into<String>) -> Self {
        self.metadata(CommandType::Message, name, None)
    }

    pub fn metadata(mut self, kind: CommandType, name: impl Into<String>, description: Option<String>) -> Self {
        self.metadata = Some(CommandMetadata {
            kind,
            name: name.into(),
            description,
            enabled_by_default: true,
        });
        self
    }

    pub fn builder(mut self, routine: BuilderRoutine) -> Self {
        self.builders.push(routine);
        self
    }

    /// Restrict the command to a scope (guild). May be called repeatedly.
    pub fn scope(mut self, scope: Snowflake) -> Self {
        self.scopes.insert(scope);
        self
    }

    pub fn scopes(mut self, scopes: impl IntoIterator<Item = Snowflake>) -> Self {
        self.scopes.extend(scopes);
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn static_metadata(&self) -> Option<&CommandMetadata> {
        self.metadata.as_ref()
    }

    pub fn builder_routines(&self) -> &[BuilderRoutine] {
        &self.builders
    }

    pub fn target_scopes(&self) -> &BTreeSet<Snowflake> {
        &self.scopes
    }

    pub fn is_global(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Lifetime used for instances; unannotated declarations are transient.
    pub fn resolved_lifetime(&self) -> Lifetime {
        self.lifetime.unwrap_or_default()
    }

    pub fn factory(&self) -> &HandlerFactory {
        &self.factory
    }
}

impl fmt::Debug for HandlerDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDeclaration")
            .field("type_name", &self.type_name)
            .field("metadata", &self.metadata)
            .field("builders", &self.builders)
            .field("scopes", &self.scopes)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// A named group of declarations, selected by name from configuration.
#[derive(Debug, Clone)]
pub struct CommandModule {
    name: String,
    declarations: Vec<Arc<HandlerDeclaration>>,
}

impl CommandModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
        }
    }

    pub fn declare(mut self, declaration: HandlerDeclaration) -> Self {
        self.declarations.push(Arc::new(declaration));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declarations(&self) -> &[Arc<HandlerDeclaration>] {
        &self.declarations
    }
}
