//! Config validation with field paths and user-facing messages.

use thiserror::Error;

use crate::schema::ParleyConfig;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Emit every finding through `tracing`.
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &ParleyConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_discord(config, &mut report);
    validate_gateway(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_discord(config: &ParleyConfig, report: &mut ValidationReport) {
    let discord = config.discord.as_ref();

    match discord.and_then(|d| d.public_key.as_deref()).map(str::trim) {
        None | Some("") => report.error("discord.publicKey", "Public key is required to verify interactions"),
        Some(key) => match hex::decode(key) {
            Ok(bytes) if bytes.len() == 32 => {}
            Ok(bytes) => report.error(
                "discord.publicKey",
                format!("Public key must be 32 bytes (64 hex characters), got {} bytes", bytes.len()),
            ),
            Err(e) => report.error("discord.publicKey", format!("Public key is not valid hex: {e}")),
        },
    }

    let Some(discord) = discord else { return };
    if discord.register_commands == Some(true) {
        if discord.bot_token.as_deref().map(str::is_empty).unwrap_or(true) {
            report.warn("discord.botToken", "Command registration is enabled but no bot token is set");
        }
        if discord.application_id.is_none() {
            report.warn("discord.applicationId", "Command registration is enabled but no application id is set");
        }
    }
    if let Some(url) = &discord.api_base_url {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            report.error("discord.apiBaseUrl", format!("'{url}' is not an http(s) URL"));
        }
    }
}

fn validate_gateway(config: &ParleyConfig, report: &mut ValidationReport) {
    let Some(gw) = &config.gateway else { return };
    if let Some(port) = gw.port {
        if port == 0 {
            report.error("gateway.port", "Port must be > 0");
        } else if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "gateway.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
    for (i, route) in gw.routes.iter().flatten().enumerate() {
        if route.trim().is_empty() {
            report.error(format!("gateway.routes[{i}]"), "Route cannot be empty");
        } else if !route.starts_with('/') {
            report.error(format!("gateway.routes[{i}]"), format!("Route '{route}' must start with '/'"));
        }
    }
    if gw.routes.as_ref().is_some_and(Vec::is_empty) {
        report.warn("gateway.routes", "No routes configured; every POST request is treated as an interaction");
    }
    if gw.max_body_bytes == Some(0) {
        report.error("gateway.maxBodyBytes", "maxBodyBytes must be > 0");
    }
}

fn validate_logging(config: &ParleyConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if logging.json == Some(true) && logging.dir.is_none() {
        report.warn("logging.json", "JSON output only applies to the log file; set logging.dir");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DiscordConfig, GatewayConfig};

    const KEY: &str = "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c";

    fn with_key() -> ParleyConfig {
        ParleyConfig {
            discord: Some(DiscordConfig {
                public_key: Some(KEY.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn public_key_is_required() {
        let report = validate(&ParleyConfig::default());
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "discord.publicKey");
        assert!(validate(&with_key()).is_valid());
    }

    #[test]
    fn short_public_key_is_error() {
        let mut cfg = with_key();
        cfg.discord.as_mut().unwrap().public_key = Some("abcd".into());
        let report = validate(&cfg);
        assert!(report.errors[0].message.contains("32 bytes"));
    }

    #[test]
    fn relative_route_is_error() {
        let mut cfg = with_key();
        cfg.gateway = Some(GatewayConfig {
            routes: Some(vec!["/ok".into(), "interactions".into()]),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "gateway.routes[1]");
    }

    #[test]
    fn registration_without_credentials_warns() {
        let mut cfg = with_key();
        cfg.discord.as_mut().unwrap().register_commands = Some(true);
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
    }
}
