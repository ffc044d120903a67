//! Application command definitions as understood by the remote command catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;
use crate::snowflake::{self, Snowflake};

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_DESCRIPTION_LENGTH: usize = 100;
pub const MAX_CHOICE_NAME_LENGTH: usize = 100;
pub const MAX_CHOICE_VALUE_LENGTH: usize = 100;

// ---------------------------------------------------------------------------
// Command type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CommandType {
    /// Slash command typed into the chat box.
    ChatInput,
    /// Context-menu command on a user.
    User,
    /// Context-menu command on a message.
    Message,
}

impl CommandType {
    pub fn requires_description(self) -> bool {
        matches!(self, CommandType::ChatInput)
    }
}

impl Default for CommandType {
    fn default() -> Self {
        CommandType::ChatInput
    }
}

impl TryFrom<u8> for CommandType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CommandType::ChatInput),
            2 => Ok(CommandType::User),
            3 => Ok(CommandType::Message),
            other => Err(format!("unknown application command type {other}")),
        }
    }
}

impl From<CommandType> for u8 {
    fn from(value: CommandType) -> Self {
        match value {
            CommandType::ChatInput => 1,
            CommandType::User => 2,
            CommandType::Message => 3,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::ChatInput => write!(f, "chat-input"),
            CommandType::User => write!(f, "user"),
            CommandType::Message => write!(f, "message"),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OptionType {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
}

impl TryFrom<u8> for OptionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => OptionType::SubCommand,
            2 => OptionType::SubCommandGroup,
            3 => OptionType::String,
            4 => OptionType::Integer,
            5 => OptionType::Boolean,
            6 => OptionType::User,
            7 => OptionType::Channel,
            8 => OptionType::Role,
            9 => OptionType::Mentionable,
            10 => OptionType::Number,
            other => return Err(format!("unknown command option type {other}")),
        })
    }
}

impl From<OptionType> for u8 {
    fn from(value: OptionType) -> Self {
        match value {
            OptionType::SubCommand => 1,
            OptionType::SubCommandGroup => 2,
            OptionType::String => 3,
            OptionType::Integer => 4,
            OptionType::Boolean => 5,
            OptionType::User => 6,
            OptionType::Channel => 7,
            OptionType::Role => 8,
            OptionType::Mentionable => 9,
            OptionType::Number => 10,
        }
    }
}

/// Value of a predefined option choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    name: String,
    value: ChoiceValue,
}

impl OptionChoice {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Result<Self, DefinitionError> {
        let value = value.into();
        let len = value.chars().count();
        if len == 0 || len > MAX_CHOICE_VALUE_LENGTH {
            return Err(DefinitionError::InvalidChoiceValue {
                max: MAX_CHOICE_VALUE_LENGTH,
                len,
            });
        }
        Self::new(name.into(), ChoiceValue::String(value))
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Result<Self, DefinitionError> {
        Self::new(name.into(), ChoiceValue::Integer(value))
    }

    pub fn number(name: impl Into<String>, value: f64) -> Result<Self, DefinitionError> {
        Self::new(name.into(), ChoiceValue::Number(value))
    }

    fn new(name: String, value: ChoiceValue) -> Result<Self, DefinitionError> {
        check_name("option choice", &name, MAX_CHOICE_NAME_LENGTH)?;
        Ok(Self { name, value })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ChoiceValue {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    name: String,
    description: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
}

impl CommandOption {
    pub fn new(
        kind: OptionType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        let description = description.into();
        check_name("command option", &name, MAX_NAME_LENGTH)?;
        check_description("command option", &description)?;
        Ok(Self {
            name,
            description,
            kind,
            required: None,
            options: Vec::new(),
            choices: Vec::new(),
        })
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_choice(mut self, choice: OptionChoice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

// ---------------------------------------------------------------------------
// Command definition
// ---------------------------------------------------------------------------

/// A command as sent to, and returned by, the remote catalog.
///
/// `id`, `application_id`, `guild_id` and `version` are assigned remotely and
/// stay `None` until a registration round-trip has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "type", default)]
    kind: CommandType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(rename = "default_permission", default, skip_serializing_if = "Option::is_none")]
    pub enabled_by_default: Option<bool>,

    #[serde(default, with = "snowflake::option", skip_serializing_if = "Option::is_none")]
    id: Option<Snowflake>,
    #[serde(default, with = "snowflake::option", skip_serializing_if = "Option::is_none")]
    application_id: Option<Snowflake>,
    #[serde(default, with = "snowflake::option", skip_serializing_if = "Option::is_none")]
    guild_id: Option<Snowflake>,
    #[serde(default, with = "snowflake::option", skip_serializing_if = "Option::is_none")]
    version: Option<Snowflake>,
}

impl CommandDefinition {
    /// Build a definition, enforcing the name and description rules for `kind`.
    pub fn new(
        kind: CommandType,
        name: impl Into<String>,
        description: Option<String>,
        enabled_by_default: bool,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        check_name("application command", &name, MAX_NAME_LENGTH)?;
        let description = match (kind.requires_description(), description) {
            (true, Some(d)) => {
                check_description("application command", &d)?;
                Some(d)
            }
            (true, None) => {
                return Err(DefinitionError::InvalidDescription {
                    entity: "application command",
                    max: MAX_DESCRIPTION_LENGTH,
                    len: 0,
                })
            }
            (false, Some(d)) if !d.is_empty() => {
                return Err(DefinitionError::UnexpectedDescription(kind.to_string()))
            }
            (false, _) => None,
        };

        Ok(Self {
            name,
            description,
            kind,
            options: Vec::new(),
            enabled_by_default: Some(enabled_by_default),
            id: None,
            application_id: None,
            guild_id: None,
            version: None,
        })
    }

    pub fn slash(name: impl Into<String>, description: impl Into<String>) -> Result<Self, DefinitionError> {
        Self::new(CommandType::ChatInput, name, Some(description.into()), true)
    }

    pub fn user(name: impl Into<String>) -> Result<Self, DefinitionError> {
        Self::new(CommandType::User, name, None, true)
    }

    pub fn message(name: impl Into<String>) -> Result<Self, DefinitionError> {
        Self::new(CommandType::Message, name, None, true)
    }

    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Attach a remotely assigned id.
    pub fn with_id(mut self, id: Snowflake) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> CommandType {
        self.kind
    }

    /// Remote id; `None` for definitions that have not been registered yet.
    pub fn id(&self) -> Option<Snowflake> {
        self.id
    }

    pub fn application_id(&self) -> Option<Snowflake> {
        self.application_id
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.guild_id
    }

    pub fn version(&self) -> Option<Snowflake> {
        self.version
    }
}

fn check_name(entity: &'static str, name: &str, max: usize) -> Result<(), DefinitionError> {
    let len = name.chars().count();
    if name.trim().is_empty() || len > max {
        return Err(DefinitionError::InvalidName { entity, max, len });
    }
    Ok(())
}

fn check_description(entity: &'static str, description: &str) -> Result<(), DefinitionError> {
    let len = description.chars().count();
    if description.trim().is_empty() || len > MAX_DESCRIPTION_LENGTH {
        return Err(DefinitionError::InvalidDescription {
            entity,
            max: MAX_DESCRIPTION_LENGTH,
            len,
        });
    }
    Ok(())
}
