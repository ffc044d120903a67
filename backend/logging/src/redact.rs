//! Log Redaction
//!
//! Scrubs bot tokens and `Authorization` header values from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static AUTH_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(Bot|Bearer)\s+[A-Za-z0-9\-._~+/]{20,}=*").unwrap());
static BOT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[MNO][A-Za-z0-9_-]{23,27}\.[A-Za-z0-9_-]{6}\.[A-Za-z0-9_-]{27,40}").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = AUTH_HEADER_RE.replace_all(input, "$1 [REDACTED_TOKEN]");
    BOT_TOKEN_RE.replace_all(&redacted, "[REDACTED_TOKEN]").into_owned()
}
