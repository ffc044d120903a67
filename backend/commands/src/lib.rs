//! `parley-commands`: Command handlers, their declarations, and the startup
//! registrar that binds remote command ids to local handlers.

pub mod builder;
pub mod cache;
pub mod declaration;
pub mod error;
pub mod handler;
pub mod loader;
pub mod registrar;
pub mod services;

pub use builder::CommandBuilder;
pub use cache::{CommandHandlerCache, HandlerDescriptor, HandlerRef, HandlerScope};
pub use declaration::{
    BuilderArgs, BuilderRoutine, CommandMetadata, CommandModule, HandlerDeclaration, HandlerFactory,
    ParameterSpec, Receiver,
};
pub use error::CommandError;
pub use handler::{InteractionCommandHandler, InvocationContext};
pub use loader::DeclarationLoader;
pub use registrar::{
    CommandCatalog, CommandKey, CommandsRegistrar, Partition, PartitionOutcome, PartitionPlan,
    RegistrarOptions, RegistrarState, RegistrationReport,
};
pub use services::{Lifetime, ServiceCollection, ServiceProvider, ServiceRef};
