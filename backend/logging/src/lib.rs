//! Structured logging for the parley gateway.
//!
//! Console output, optional daily-rolling log files, and scrubbing of
//! credentials from strings before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LogOptions};
pub use redact::redact_sensitive_data;
