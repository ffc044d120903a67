//! `parley-core`: Protocol data model for the parley interactions gateway.

pub mod command;
pub mod error;
pub mod interaction;
pub mod response;
pub mod snowflake;

pub use command::{
    ChoiceValue, CommandDefinition, CommandOption, CommandType, OptionChoice, OptionType,
};
pub use error::DefinitionError;
pub use interaction::{
    GuildMember, Interaction, InteractionData, InteractionOption, InteractionType, ResolvedData,
    User,
};
pub use response::{
    AllowedMentions, Embed, InteractionResponse, InteractionResponseBuilder, ResponseData,
    ResponseType,
};
pub use snowflake::Snowflake;
