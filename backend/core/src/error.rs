use thiserror::Error;

/// Validation failures raised while constructing protocol entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("{entity} name must be between 1 and {max} characters long, got {len}")]
    InvalidName {
        entity: &'static str,
        max: usize,
        len: usize,
    },

    #[error("{entity} description must be between 1 and {max} characters long, got {len}")]
    InvalidDescription {
        entity: &'static str,
        max: usize,
        len: usize,
    },

    #[error("commands of type {0} cannot have a description")]
    UnexpectedDescription(String),

    #[error("option choice value must be between 1 and {max} characters long, got {len}")]
    InvalidChoiceValue { max: usize, len: usize },
}
