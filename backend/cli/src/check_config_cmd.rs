//! `parley check-config`: print the effective config with secrets masked.

use std::path::Path;

use anyhow::Result;
use parley_config::{collect_redacted_paths, collect_referenced_vars, load_raw, prepare, redact};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

pub async fn run(path: &Path, json: bool) -> Result<bool> {
    note_info(&format!("Config file: {}", path.display()));
    let raw = load_raw(path).await?;
    let (config, report) = prepare(&raw)?;

    let value = serde_json::to_value(&config)?;
    let masked = collect_redacted_paths(&value);
    let value = redact(&value);
    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", serde_yaml::to_string(&value)?);
    }

    let referenced = collect_referenced_vars(&raw);
    if !referenced.is_empty() {
        note_info(&format!("Environment: {}", referenced.join(", ")));
    }
    if !masked.is_empty() {
        note_info(&format!("Masked: {}", masked.join(", ")));
    }
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }

    if report.is_valid() {
        note_success("Config is valid");
    }
    Ok(report.is_valid())
}
