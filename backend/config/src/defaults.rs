//! Config defaults: fills every unset field after loading.

use crate::schema::{DiscordConfig, GatewayConfig, LoggingConfig, ParleyConfig};

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ROUTE: &str = "/api/discord/interactions";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn apply_all_defaults(config: ParleyConfig) -> ParleyConfig {
    let config = apply_discord_defaults(config);
    let config = apply_gateway_defaults(config);
    apply_logging_defaults(config)
}

/// Registration is opt-in.
fn apply_discord_defaults(mut config: ParleyConfig) -> ParleyConfig {
    let discord = config.discord.get_or_insert_with(DiscordConfig::default);
    discord.register_commands.get_or_insert(false);
    discord
        .api_base_url
        .get_or_insert_with(|| DEFAULT_API_BASE_URL.to_string());
    config
}

fn apply_gateway_defaults(mut config: ParleyConfig) -> ParleyConfig {
    let gateway = config.gateway.get_or_insert_with(GatewayConfig::default);
    gateway.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    gateway.port.get_or_insert(DEFAULT_PORT);
    gateway
        .routes
        .get_or_insert_with(|| vec![DEFAULT_ROUTE.to_string()]);
    gateway.handle_pings.get_or_insert(true);
    gateway.await_registration.get_or_insert(false);
    gateway.max_body_bytes.get_or_insert(DEFAULT_MAX_BODY_BYTES);
    config
}

fn apply_logging_defaults(mut config: ParleyConfig) -> ParleyConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_gateway_defaults() {
        let cfg = apply_all_defaults(ParleyConfig::default());
        let gateway = cfg.gateway.unwrap();
        assert_eq!(gateway.port, Some(DEFAULT_PORT));
        assert_eq!(gateway.routes.unwrap(), vec![DEFAULT_ROUTE.to_string()]);
        assert_eq!(gateway.handle_pings, Some(true));
        assert_eq!(gateway.await_registration, Some(false));
        assert_eq!(cfg.discord.unwrap().register_commands, Some(false));
    }

    #[test]
    fn keeps_user_values() {
        let cfg = ParleyConfig {
            gateway: Some(GatewayConfig {
                routes: Some(Vec::new()),
                handle_pings: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let gateway = apply_all_defaults(cfg).gateway.unwrap();
        assert_eq!(gateway.routes, Some(Vec::new()));
        assert_eq!(gateway.handle_pings, Some(false));
    }
}
