//! Inbound interaction payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{CommandType, OptionType};
use crate::snowflake::{self, Snowflake};

// ---------------------------------------------------------------------------
// Interaction type
// ---------------------------------------------------------------------------

/// Kind of an inbound interaction. Kinds the gateway does not branch on are
/// kept as `Other` so payloads from newer protocol versions still parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    ApplicationCommandAutocomplete,
    ModalSubmit,
    Other(u8),
}

impl From<u8> for InteractionType {
    fn from(value: u8) -> Self {
        match value {
            1 => InteractionType::Ping,
            2 => InteractionType::ApplicationCommand,
            3 => InteractionType::MessageComponent,
            4 => InteractionType::ApplicationCommandAutocomplete,
            5 => InteractionType::ModalSubmit,
            other => InteractionType::Other(other),
        }
    }
}

impl From<InteractionType> for u8 {
    fn from(value: InteractionType) -> Self {
        match value {
            InteractionType::Ping => 1,
            InteractionType::ApplicationCommand => 2,
            InteractionType::MessageComponent => 3,
            InteractionType::ApplicationCommandAutocomplete => 4,
            InteractionType::ModalSubmit => 5,
            InteractionType::Other(other) => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(with = "snowflake")]
    pub id: Snowflake,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// `<@id>` mention markup.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// A single option value supplied by the invoking user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionOption>,
    #[serde(default)]
    pub focused: bool,
}

/// Entities referenced by option values, keyed by their id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: HashMap<String, User>,
    #[serde(default)]
    pub members: HashMap<String, GuildMember>,
    #[serde(default)]
    pub roles: HashMap<String, Value>,
    #[serde(default)]
    pub channels: HashMap<String, Value>,
    #[serde(default)]
    pub messages: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    /// Command id; absent on component and modal interactions.
    #[serde(default, with = "snowflake::option", skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub command_type: CommandType,
    #[serde(default, with = "snowflake::option", skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Value>,
}

impl InteractionData {
    fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
            .and_then(|o| o.value.as_ref())
    }

    pub fn string_option(&self, name: &str) -> Option<String> {
        self.option(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn integer_option(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn number_option(&self, name: &str) -> Option<f64> {
        self.option(name).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn boolean_option(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn resolved_user(&self, id: Snowflake) -> Option<&User> {
        self.resolved.as_ref()?.users.get(&id.to_string())
    }

    pub fn resolved_member(&self, id: Snowflake) -> Option<&GuildMember> {
        self.resolved.as_ref()?.members.get(&id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

/// One inbound webhook event. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default, with = "snowflake")]
    pub id: Snowflake,
    #[serde(default, with = "snowflake")]
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
    #[serde(default, with = "snowflake::option", skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, with = "snowflake::option", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<GuildMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl Interaction {
    pub fn is_ping(&self) -> bool {
        self.kind == InteractionType::Ping
    }

    /// Remote id of the invoked command, if this interaction carries one.
    pub fn command_id(&self) -> Option<Snowflake> {
        self.data.as_ref().and_then(|d| d.id)
    }

    /// The user that triggered the interaction. Inside guilds the user is
    /// only present on the member object.
    pub fn invoking_user(&self) -> Option<&User> {
        self.user
            .as_ref()
            .or_else(|| self.member.as_ref().and_then(|m| m.user.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_ping() {
        let i: Interaction = serde_json::from_str(r#"{"type":1}"#).unwrap();
        assert!(i.is_ping());
        assert_eq!(i.command_id(), None);
    }

    #[test]
    fn parses_command_with_options() {
        let json = r#"{
            "id": "100", "application_id": "200", "type": 2, "token": "t", "version": 1,
            "guild_id": "300",
            "member": {"user": {"id": "400", "username": "tehgm"}, "roles": []},
            "data": {
                "id": "1234", "name": "say", "type": 1,
                "options": [
                    {"name": "text", "type": 3, "value": "hello"},
                    {"name": "Embed", "type": 5, "value": true},
                    {"name": "count", "type": 4, "value": 3}
                ]
            }
        }"#;
        let i: Interaction = serde_json::from_str(json).unwrap();
        assert_eq!(i.kind, InteractionType::ApplicationCommand);
        assert_eq!(i.command_id(), Some(1234));
        assert_eq!(i.invoking_user().map(|u| u.id), Some(400));

        let data = i.data.as_ref().unwrap();
        assert_eq!(data.string_option("text").as_deref(), Some("hello"));
        assert_eq!(data.boolean_option("embed"), Some(true));
        assert_eq!(data.integer_option("count"), Some(3));
        assert_eq!(data.number_option("count"), Some(3.0));
        assert_eq!(data.string_option("missing"), None);
    }

    #[test]
    fn component_and_modal_data_have_no_command_id() {
        let button: Interaction = serde_json::from_str(
            r#"{"id":"1","application_id":"2","type":3,"token":"t","version":1,
                "data":{"custom_id":"btn","component_type":2}}"#,
        )
        .unwrap();
        assert_eq!(button.kind, InteractionType::MessageComponent);
        assert_eq!(button.command_id(), None);
        assert_eq!(button.data.as_ref().unwrap().custom_id.as_deref(), Some("btn"));
        assert_eq!(button.data.as_ref().unwrap().component_type, Some(2));

        let modal: Interaction = serde_json::from_str(
            r#"{"id":"1","application_id":"2","type":5,"token":"t","version":1,
                "data":{"custom_id":"feedback","components":[{"type":1,"components":[]}]}}"#,
        )
        .unwrap();
        assert_eq!(modal.kind, InteractionType::ModalSubmit);
        assert_eq!(modal.command_id(), None);
        assert_eq!(modal.data.unwrap().components.len(), 1);
    }

    #[test]
    fn unknown_interaction_types_are_kept() {
        let i: Interaction = serde_json::from_str(r#"{"type":42}"#).unwrap();
        assert_eq!(i.kind, InteractionType::Other(42));
        assert_eq!(u8::from(i.kind), 42);
    }
}
