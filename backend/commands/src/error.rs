use parley_core::{CommandType, DefinitionError};
use thiserror::Error;

/// Errors raised while building, registering or resolving command handlers.
///
/// Declaration problems surface at build time during registration, never per
/// request.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command handler {handler} cannot be built - only 1 builder routine can be declared, found {count}")]
    AmbiguousBuilder { handler: &'static str, count: usize },

    #[error("command handler {handler} cannot be built - builder routine `{routine}` is not static")]
    NonStaticBuilder {
        handler: &'static str,
        routine: &'static str,
    },

    #[error("command handler {handler} cannot be built - builder routine `{routine}` returns {found}, expected a command definition or a future of one")]
    InvalidReturnType {
        handler: &'static str,
        routine: &'static str,
        found: &'static str,
    },

    #[error("command handler {handler} cannot be built - unsupported parameter type {parameter} on builder routine `{routine}`")]
    UnresolvedParameter {
        handler: &'static str,
        routine: &'static str,
        parameter: &'static str,
    },

    #[error("command handler {handler} cannot be built - parameter {parameter} of builder routine `{routine}` failed to resolve: {message}")]
    ParameterResolution {
        handler: &'static str,
        routine: &'static str,
        parameter: &'static str,
        message: String,
    },

    #[error("command handler {handler} cannot be built - declaration has neither a builder routine nor static metadata")]
    MissingMetadata { handler: &'static str },

    #[error("command handler {handler} produced an invalid command definition: {source}")]
    InvalidDefinition {
        handler: &'static str,
        #[source]
        source: DefinitionError,
    },

    #[error("builder routine of command handler {handler} failed: {message}")]
    BuilderFailed {
        handler: &'static str,
        message: String,
    },

    #[error("duplicate command ({name}, {kind}) in {partition} partition")]
    DuplicateCommand {
        partition: String,
        name: String,
        kind: CommandType,
    },

    #[error("failed to construct command handler {handler}: {message}")]
    HandlerConstruction {
        handler: &'static str,
        message: String,
    },

    #[error("command registration has already run")]
    AlreadyRan,

    #[error("command handler cache has been disposed")]
    Disposed,
}
