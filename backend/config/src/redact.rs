//! Config redaction: mask credentials before the config is printed or logged.

use serde_json::Value;

static SENSITIVE_KEYS: &[&str] = &[
    "botToken",
    "bot_token",
    "token",
    "secret",
    "clientSecret",
    "client_secret",
    "password",
    "authorization",
];

/// Copy of `value` with every sensitive string replaced by a short hint.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) if is_sensitive_key(k) => Value::String(mask(s)),
                        other => redact(other),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Dotted paths of every field [`redact`] would mask.
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    fn walk(value: &Value, path: &str, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                    match v {
                        Value::String(s) if is_sensitive_key(k) && !s.is_empty() => out.push(child),
                        other => walk(other, &child, out),
                    }
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    walk(v, &format!("{path}[{i}]"), out);
                }
            }
            _ => {}
        }
    }

    let mut paths = Vec::new();
    walk(value, "", &mut paths);
    paths
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Keep the first four characters as a hint.
fn mask(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_bot_token() {
        let v = json!({"discord": {"botToken": "MTIzNDU2Nzg5.abcdef.secretpart", "publicKey": "abcd"}});
        let out = redact(&v);
        assert_eq!(out["discord"]["botToken"], "MTIz***");
        assert_eq!(out["discord"]["publicKey"], "abcd");
        assert_eq!(collect_redacted_paths(&v), vec!["discord.botToken"]);
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let out = redact(&json!({"token": "abc"}));
        assert_eq!(out["token"], "***");
    }

    #[test]
    fn passthrough_non_sensitive() {
        let v = json!({"gateway": {"routes": ["/api/discord/interactions"], "port": 8080}});
        assert_eq!(redact(&v), v);
    }
}
