//! Structured Logger
//!
//! Console output plus an optional daily-rolling file (`parley.log.YYYY-MM-DD`),
//! filtered by `RUST_LOG` or the configured level.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "parley.log";

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for the rolling log file; `None` logs to the console only.
    pub dir: Option<PathBuf>,
    /// Write the log file as JSON lines.
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_logger(options: &LogOptions) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .with_context(|| format!("Invalid log level directive: {}", options.level))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let file_layer = match &options.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let layer = fmt::layer().with_writer(appender).with_ansi(false);
            Some(if options.json { layer.json().boxed() } else { layer.boxed() })
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_level_directive() {
        // only meaningful when RUST_LOG does not override the directive
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let options = LogOptions {
            level: "parley=loud".to_string(),
            ..Default::default()
        };
        assert!(init_logger(&options).is_err());
    }
}
