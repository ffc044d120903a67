//! Turns the loaded config file into the option structs each crate takes.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parley_commands::RegistrarOptions;
use parley_config::{defaults, ParleyConfig};
use parley_core::Snowflake;
use parley_gateway::GatewayOptions;
use parley_logging::LogOptions;

/// Fully resolved runtime settings; every default already applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub public_key: String,
    pub application_id: Option<Snowflake>,
    pub bot_token: Option<String>,
    pub api_base_url: String,
    pub registrar: RegistrarOptions,
    pub gateway: GatewayOptions,
    pub bind: String,
    pub port: u16,
    pub logging: LogOptions,
}

impl Settings {
    pub fn from_config(config: &ParleyConfig) -> Self {
        let discord = config.discord.clone().unwrap_or_default();
        let gateway = config.gateway.clone().unwrap_or_default();
        let logging = config.logging.clone().unwrap_or_default();

        Self {
            public_key: discord.public_key.unwrap_or_default(),
            application_id: discord.application_id,
            bot_token: discord.bot_token.filter(|t| !t.is_empty()),
            api_base_url: discord
                .api_base_url
                .unwrap_or_else(|| defaults::DEFAULT_API_BASE_URL.to_string()),
            registrar: RegistrarOptions {
                enabled: discord.register_commands.unwrap_or(false),
                modules: discord.command_modules,
            },
            gateway: GatewayOptions {
                routes: gateway
                    .routes
                    .unwrap_or_else(|| vec![defaults::DEFAULT_ROUTE.to_string()]),
                handle_pings: gateway.handle_pings.unwrap_or(true),
                await_registration: gateway.await_registration.unwrap_or(false),
                max_body_bytes: gateway.max_body_bytes.unwrap_or(defaults::DEFAULT_MAX_BODY_BYTES),
            },
            bind: gateway.bind.unwrap_or_else(|| defaults::DEFAULT_BIND.to_string()),
            port: gateway.port.unwrap_or(defaults::DEFAULT_PORT),
            logging: LogOptions {
                level: logging
                    .level
                    .unwrap_or_else(|| defaults::DEFAULT_LOG_LEVEL.to_string()),
                dir: logging.dir.map(PathBuf::from),
                json: logging.json.unwrap_or(false),
            },
        }
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_a_file() {
        let settings = Settings::from_config(&parley_config::apply_all_defaults(ParleyConfig::default()));
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.gateway.routes, vec!["/api/discord/interactions".to_string()]);
        assert!(!settings.registrar.enabled);
        assert_eq!(settings.addr().unwrap().to_string(), "0.0.0.0:8080");
    }
}
