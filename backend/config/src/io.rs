//! Config file location and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "parley.yaml";

/// Resolve the config directory.
/// Priority: `PARLEY_CONFIG_DIR` env > `~/.parley/` > `./.parley`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARLEY_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".parley"),
        None => PathBuf::from(".parley"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped value tree, before env substitution.
///
/// A missing file yields an empty object so that defaults apply (first run).
pub async fn load_raw(path: &Path) -> Result<Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let value = parse_yaml(&raw).with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

pub fn parse_yaml(raw: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(raw)?;
    // an empty document parses as null
    Ok(if value.is_null() { Value::Object(Default::default()) } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_an_empty_object() {
        assert_eq!(parse_yaml("").unwrap(), serde_json::json!({}));
        assert_eq!(parse_yaml("gateway:\n  port: 1\n").unwrap()["gateway"]["port"], 1);
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("parley-config-does-not-exist").join(CONFIG_FILE_NAME);
        assert_eq!(load_raw(&path).await.unwrap(), serde_json::json!({}));
    }

    #[test]
    fn config_file_lives_in_config_dir() {
        let dir = PathBuf::from("/etc/parley");
        assert_eq!(config_file_path(&dir), PathBuf::from("/etc/parley/parley.yaml"));
    }
}
