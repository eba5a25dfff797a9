//! Secret redaction for structured log fields.
//!
//! Session tooling logs around OAuth codes, JWTs and refresh tokens. None of
//! them may reach the log file, whatever the mode.

use serde_json::{Map, Value};

use crate::ObservabilityMode;

const REDACTED: &str = "[REDACTED]";

const DENYLIST_KEYS: [&str; 9] = [
    "token",
    "authorization",
    "cookie",
    "password",
    "secret",
    "code",
    "private_key",
    "otp",
    "credential",
];

/// Fields that survive in metadata-only mode.
pub(crate) const PROD_ALLOWED_FIELDS: [&str; 9] = [
    "status",
    "state",
    "from",
    "to",
    "redirect_to",
    "delay_ms",
    "period_secs",
    "strategy",
    "component",
];

/// Redact an event's fields for `mode`.
pub(crate) fn apply(mode: ObservabilityMode, fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .filter(|(key, _)| {
            mode == ObservabilityMode::DevVerbose || PROD_ALLOWED_FIELDS.contains(&key.as_str())
        })
        .map(|(key, value)| {
            let value = sanitize_value(&key, &value);
            (key, value)
        })
        .collect()
}

/// Redact a single value under `key`.
pub fn sanitize_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) => sanitize_string(s),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), sanitize_value(k, v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_value(key, item))
                .collect::<Vec<_>>(),
        ),
        _ => value.clone(),
    }
}

fn sanitize_string(raw: &str) -> Value {
    if looks_like_sensitive_value(raw) {
        return Value::String(REDACTED.to_string());
    }
    if raw.len() > 512 {
        return Value::String(format!("[TRUNCATED:{} bytes]", raw.len()));
    }
    Value::String(raw.to_string())
}

fn looks_like_sensitive_value(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("bearer ") || lower.starts_with("basic ") {
        return true;
    }
    if raw.matches('.').count() == 2 && raw.len() > 40 && !raw.contains(' ') {
        return true;
    }
    is_long_hex(raw) || is_long_base64(raw)
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

fn is_long_hex(value: &str) -> bool {
    value.len() > 48 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_long_base64(value: &str) -> bool {
    value.len() > 48
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sensitive_keys_are_redacted() {
        for key in ["id_token", "refresh_token", "client_secret", "code", "Authorization"] {
            assert_eq!(sanitize_value(key, &json!("abc")), json!(REDACTED), "{key}");
        }
        assert_eq!(sanitize_value("user_id", &json!("abc")), json!("abc"));
    }

    #[test]
    fn jwt_like_values_are_redacted_under_any_key() {
        let jwt = format!("{}.{}.{}", "h".repeat(20), "p".repeat(20), "s".repeat(10));
        assert_eq!(sanitize_value("error", &json!(jwt)), json!(REDACTED));
        assert_eq!(
            sanitize_value("header", &json!("Bearer abc")),
            json!(REDACTED)
        );
        assert_eq!(
            sanitize_value("blob", &json!("a".repeat(60))),
            json!(REDACTED)
        );
    }

    #[test]
    fn sentences_with_dots_are_kept() {
        let message = "Token endpoint returned 400. Body: invalid_grant.";
        assert_eq!(sanitize_value("error", &json!(message)), json!(message));
    }

    #[test]
    fn nested_objects_are_walked() {
        let value = json!({"user": {"email": "a@b.c", "access_token": "x"}, "list": ["ok"]});
        let sanitized = sanitize_value("payload", &value);
        assert_eq!(sanitized["user"]["email"], json!("a@b.c"));
        assert_eq!(sanitized["user"]["access_token"], json!(REDACTED));
        assert_eq!(sanitized["list"], json!(["ok"]));
    }

    #[test]
    fn metadata_only_keeps_allowlisted_fields() {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(400));
        fields.insert("email".to_string(), json!("a@b.c"));
        fields.insert("redirect_to".to_string(), json!("/dashboard"));

        let kept = apply(ObservabilityMode::ProdMetadataOnly, fields.clone());
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.get("status"), Some(&json!(400)));
        assert!(kept.get("email").is_none());

        assert_eq!(apply(ObservabilityMode::DevVerbose, fields).len(), 3);
    }
}
