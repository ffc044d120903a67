//! `parley-config`: Runtime configuration for the interactions gateway.
//!
//! Provides:
//! - Typed config schema (discord credentials, gateway pipeline, logging)
//! - YAML loading
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation and redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw, parse_yaml};
pub use redact::{collect_redacted_paths, redact};
pub use schema::{DiscordConfig, GatewayConfig, LoggingConfig, ParleyConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, substitute env vars, apply defaults and validate a config file.
///
/// Callers decide whether errors are fatal; see [`ValidationReport::log`].
pub async fn load_and_prepare(path: &Path) -> Result<(ParleyConfig, ValidationReport)> {
    let raw = load_raw(path).await?;
    prepare(&raw).with_context(|| format!("Failed to load config {}", path.display()))
}

/// The in-memory half of [`load_and_prepare`].
pub fn prepare(raw: &Value) -> Result<(ParleyConfig, ValidationReport)> {
    let value = resolve_env_vars(raw).context("Failed to resolve env vars in config")?;
    let config: ParleyConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(config);
    let report = validate(&config);
    Ok((config, report))
}
