//! Runtime configuration schema, typed for serde YAML/JSON deserialization.
//!
//! Every field is optional in the file; [`crate::defaults`] fills in the rest.

use parley_core::Snowflake;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParleyConfig {
    /// Application credentials and command registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,

    /// HTTP listener and interaction pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Discord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    /// Hex-encoded ed25519 public key used to verify interaction signatures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    #[serde(
        default,
        with = "parley_core::snowflake::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub application_id: Option<Snowflake>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Register commands with Discord on startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_commands: Option<bool>,

    /// Command modules to load; empty loads every compiled-in module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_modules: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Interaction routes; an empty list claims every POST path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_pings: Option<bool>,

    /// Hold command dispatch until startup registration has finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub await_registration: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<usize>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for daily-rolling log files. Unset logs to the console only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Write the log file as JSON lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}
