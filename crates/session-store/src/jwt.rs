//! JWT expiry inspection.
//!
//! Only the payload segment is decoded; signatures are not verified. Every
//! helper fails closed: an undecodable token counts as expired with expiry 0.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;

#[derive(Deserialize)]
struct ExpClaim {
    exp: f64,
}

fn decode_exp(token: &str) -> Option<f64> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) => payload.trim_end_matches('='),
        _ => return None,
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let claim: ExpClaim = serde_json::from_slice(&bytes).ok()?;
    claim.exp.is_finite().then_some(claim.exp)
}

/// Expiry of `token` in epoch milliseconds, or 0 when it cannot be decoded.
pub fn token_expiry_millis(token: &str) -> i64 {
    decode_exp(token)
        .map(|exp| (exp * 1000.0) as i64)
        .unwrap_or(0)
}

/// Whether `token` is expired at `now_ms`. Undecodable tokens are expired.
pub fn is_token_expired_at(token: &str, now_ms: i64) -> bool {
    match decode_exp(token) {
        Some(exp) => (exp * 1000.0) as i64 <= now_ms,
        None => true,
    }
}

/// Whether `token` is expired now.
pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, now_millis())
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Build an unsigned token carrying `claims`. Test helper.
#[cfg(any(test, feature = "test-support"))]
pub fn unsigned_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

/// Build an unsigned token whose `exp` is `secs` from now (negative for the past).
#[cfg(any(test, feature = "test-support"))]
pub fn token_expiring_in(secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + secs;
    unsigned_token(&serde_json::json!({ "exp": exp, "sub": "user-1" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_tokens_fail_closed() {
        let garbage = [
            "",
            "not-a-jwt",
            "a.b",
            "a.!!!.c",
            "a.e30.c", // {} has no exp
            "a.bm90IGpzb24.c",
        ];
        for token in garbage {
            assert!(is_token_expired(token), "{token:?} should count as expired");
            assert_eq!(token_expiry_millis(token), 0, "{token:?} should have expiry 0");
        }
    }

    #[test]
    fn test_string_exp_fails_closed() {
        let token = unsigned_token(&json!({"exp": "tomorrow"}));
        assert!(is_token_expired(&token));
        assert_eq!(token_expiry_millis(&token), 0);
    }

    #[test]
    fn test_expiry_in_millis() {
        let token = unsigned_token(&json!({"exp": 1_700_000_000}));
        assert_eq!(token_expiry_millis(&token), 1_700_000_000_000);
        assert!(!is_token_expired_at(&token, 1_699_999_999_000));
        assert!(is_token_expired_at(&token, 1_700_000_000_000));
    }

    #[test]
    fn test_fresh_and_stale_tokens() {
        assert!(!is_token_expired(&token_expiring_in(600)));
        assert!(is_token_expired(&token_expiring_in(-1)));
    }

    #[test]
    fn test_padded_standard_alphabet_payload() {
        let payload = STANDARD_NO_PAD.encode(r#"{"exp":1700000000,"n":"??>"}"#);
        let token = format!("h.{payload}==.s");
        assert_eq!(token_expiry_millis(&token), 1_700_000_000_000);
    }
}
