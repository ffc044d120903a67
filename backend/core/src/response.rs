//! Responses written back to the remote service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ResponseType {
    /// Acknowledges a ping.
    Pong,
    ChannelMessageWithSource,
    DeferredChannelMessageWithSource,
    DeferredUpdateMessage,
    UpdateMessage,
}

impl TryFrom<u8> for ResponseType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ResponseType::Pong),
            4 => Ok(ResponseType::ChannelMessageWithSource),
            5 => Ok(ResponseType::DeferredChannelMessageWithSource),
            6 => Ok(ResponseType::DeferredUpdateMessage),
            7 => Ok(ResponseType::UpdateMessage),
            other => Err(format!("unknown interaction response type {other}")),
        }
    }
}

impl From<ResponseType> for u8 {
    fn from(value: ResponseType) -> Self {
        match value {
            ResponseType::Pong => 1,
            ResponseType::ChannelMessageWithSource => 4,
            ResponseType::DeferredChannelMessageWithSource => 5,
            ResponseType::DeferredUpdateMessage => 6,
            ResponseType::UpdateMessage => 7,
        }
    }
}

/// Message flag marking a reply visible only to the invoking user.
pub const FLAG_EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    pub fn description(text: impl Into<String>) -> Self {
        Self {
            description: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowedMentions {
    /// Mention kinds to parse: "users", "roles", "everyone".
    #[serde(default)]
    pub parse: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: ResponseType::Pong,
            data: None,
        }
    }

    /// Plain text reply in the invoking channel.
    pub fn text(content: impl Into<String>) -> Self {
        InteractionResponseBuilder::new().text(content).build()
    }

    pub fn builder() -> InteractionResponseBuilder {
        InteractionResponseBuilder::new()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InteractionResponseBuilder {
    kind: ResponseType,
    data: ResponseData,
}

impl InteractionResponseBuilder {
    pub fn new() -> Self {
        Self {
            kind: ResponseType::ChannelMessageWithSource,
            data: ResponseData::default(),
        }
    }

    pub fn kind(mut self, kind: ResponseType) -> Self {
        self.kind = kind;
        self
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.data.content = Some(content.into());
        self
    }

    pub fn tts(mut self, tts: bool) -> Self {
        self.data.tts = Some(tts);
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.data.embeds.push(embed);
        self
    }

    pub fn allowed_mentions(mut self, mentions: AllowedMentions) -> Self {
        self.data.allowed_mentions = Some(mentions);
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        let flags = self.data.flags.unwrap_or(0);
        let flags = if ephemeral {
            flags | FLAG_EPHEMERAL
        } else {
            flags & !FLAG_EPHEMERAL
        };
        self.data.flags = (flags != 0).then_some(flags);
        self
    }

    pub fn build(self) -> InteractionResponse {
        let data = (self.data != ResponseData::default()).then_some(self.data);
        InteractionResponse { kind: self.kind, data }
    }
}

impl Default for InteractionResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_serializes_to_type_one() {
        let json = serde_json::to_string(&InteractionResponse::pong()).unwrap();
        assert_eq!(json, r#"{"type":1}"#);
    }

    #[test]
    fn builder_sets_ephemeral_flag() {
        let resp = InteractionResponse::builder()
            .text("You can't ask me to say nothing!")
            .ephemeral(true)
            .build();
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], 4);
        assert_eq!(json["data"]["flags"], 64);
        assert_eq!(json["data"]["content"], "You can't ask me to say nothing!");
    }

    #[test]
    fn clearing_ephemeral_drops_flags() {
        let resp = InteractionResponse::builder()
            .ephemeral(true)
            .ephemeral(false)
            .text("hi")
            .build();
        assert_eq!(resp.data.unwrap().flags, None);
    }
}
