// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature-blind JWT payload decoding.
//!
//! The client never verifies token signatures; the backend does. What is
//! decoded here (subject, expiry, role) is advisory and drives display and
//! routing only.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use super::error::AuthError;
use super::roles::Role;
use super::strategies;

/// Standard alphabet, padding optional: payload segments are unpadded once
/// their URL-safe characters are translated back.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Claims read out of a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    /// `sub` claim
    pub subject: Option<String>,
    /// `exp` claim, whole seconds since the Unix epoch
    pub expiry_epoch_seconds: Option<i64>,
    /// `exp` claim in milliseconds, keeping any fractional second
    pub expiry_epoch_millis: Option<i64>,
    /// The whole payload object
    pub claims: Map<String, Value>,
}

impl DecodedToken {
    /// Look up a raw claim.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self, now)
    }

    pub fn role(&self) -> Role {
        strategies::extract_role(self)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_epoch_millis
            .and_then(|exp| Utc.timestamp_millis_opt(exp).single())
    }

    /// `email` claim, if the backend includes one.
    pub fn email(&self) -> Option<&str> {
        self.claims.get("email").and_then(Value::as_str)
    }
}

/// Decode a bearer token's payload without checking its signature.
///
/// Accepts the token with or without a leading `"Bearer "`.
pub fn decode(token: &str) -> Result<DecodedToken, AuthError> {
    let raw = token.strip_prefix("Bearer ").unwrap_or(token);

    let segments: Vec<&str> = raw.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(AuthError::MalformedToken);
    };

    let translated: String = payload
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = PAYLOAD_ENGINE
        .decode(translated.as_bytes())
        .map_err(|e| AuthError::PayloadDecode(format!("base64: {e}")))?;

    let claims = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => claims,
        Ok(_) => {
            return Err(AuthError::PayloadDecode(
                "payload is not a JSON object".to_string(),
            ))
        }
        Err(e) => return Err(AuthError::PayloadDecode(format!("json: {e}"))),
    };

    let subject = claims.get("sub").and_then(|sub| match sub {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    let expiry_epoch_millis = claims.get("exp").and_then(|exp| {
        exp.as_i64()
            .map(|secs| secs.saturating_mul(1000))
            .or_else(|| exp.as_f64().map(|secs| (secs * 1000.0).round() as i64))
    });
    let expiry_epoch_seconds = expiry_epoch_millis.map(|ms| ms.div_euclid(1000));

    Ok(DecodedToken {
        subject,
        expiry_epoch_seconds,
        expiry_epoch_millis,
        claims,
    })
}

/// True iff the token carries an expiry and `now` is at or past it.
///
/// Compared in milliseconds: `exp` is seconds (possibly fractional), `now`
/// has sub-second precision.
pub fn is_expired(decoded: &DecodedToken, now: DateTime<Utc>) -> bool {
    match decoded.expiry_epoch_millis {
        Some(exp_ms) => now.timestamp_millis() >= exp_ms,
        None => false,
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::token_with_claims;
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn decode_round_trips_payload() {
        let claims = json!({
            "sub": "user@udrive.test",
            "exp": 1900000000,
            "roles": ["ROLE_CLIENT"],
            "nested": {"a": [1, 2, 3]}
        });
        let decoded = decode(&token_with_claims(&claims)).unwrap();

        assert_eq!(Value::Object(decoded.claims.clone()), claims);
        assert_eq!(decoded.subject.as_deref(), Some("user@udrive.test"));
        assert_eq!(decoded.expiry_epoch_seconds, Some(1900000000));
    }

    #[test]
    fn decode_strips_bearer_prefix() {
        let token = format!("Bearer {}", token_with_claims(&json!({"sub": "7"})));
        let decoded = decode(&token).unwrap();
        assert_eq!(decoded.subject.as_deref(), Some("7"));
    }

    #[test]
    fn decode_handles_url_safe_characters() {
        // "?>?" sits on a 3-byte boundary and encodes to "Pz4_"
        let claims = json!({"note": "?>?>?>", "sub": "x"});
        let token = token_with_claims(&claims);
        assert!(token.split('.').nth(1).unwrap().contains('_'));
        let decoded = decode(&token).unwrap();
        assert_eq!(decoded.claim("note"), Some(&json!("?>?>?>")));
    }

    #[test]
    fn numeric_subject_is_stringified() {
        let decoded = decode(&token_with_claims(&json!({"sub": 42}))).unwrap();
        assert_eq!(decoded.subject.as_deref(), Some("42"));
    }

    #[test]
    fn missing_third_segment_is_malformed() {
        let token = token_with_claims(&json!({"sub": "x"}));
        let two_parts: String = token.rsplitn(2, '.').nth(1).unwrap().to_string();
        assert!(matches!(decode(&two_parts), Err(AuthError::MalformedToken)));
        assert!(matches!(decode("opaque"), Err(AuthError::MalformedToken)));
        assert!(matches!(decode("a.b.c.d"), Err(AuthError::MalformedToken)));
    }

    #[test]
    fn invalid_json_payload_fails_decode() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let payload = URL_SAFE_NO_PAD.encode(b"{not json");
        let token = format!("e30.{payload}.sig");
        assert!(matches!(decode(&token), Err(AuthError::PayloadDecode(_))));
    }

    #[test]
    fn invalid_base64_payload_fails_decode() {
        assert!(matches!(
            decode("e30.!!!.sig"),
            Err(AuthError::PayloadDecode(_))
        ));
    }

    #[test]
    fn non_object_payload_fails_decode() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let payload = URL_SAFE_NO_PAD.encode(b"[1,2]");
        let token = format!("e30.{payload}.sig");
        assert!(matches!(decode(&token), Err(AuthError::PayloadDecode(_))));
    }

    #[test]
    fn expiry_compares_in_milliseconds() {
        let now = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();

        let past = decode(&token_with_claims(&json!({"exp": 1_699_999_999}))).unwrap();
        assert!(is_expired(&past, now));

        // exp == floor(now): now_ms (…000500) >= exp_ms (…000000)
        let same_second = decode(&token_with_claims(&json!({"exp": 1_700_000_000}))).unwrap();
        assert!(is_expired(&same_second, now));

        let future = decode(&token_with_claims(&json!({"exp": 1_700_000_001}))).unwrap();
        assert!(!is_expired(&future, now));

        let far_future = decode(&token_with_claims(&json!({"exp": 4_000_000_000i64}))).unwrap();
        assert!(!far_future.is_expired(now));
    }

    #[test]
    fn fractional_expiry_keeps_milliseconds() {
        let decoded = decode(&token_with_claims(&json!({"exp": 1_700_000_000.9}))).unwrap();
        assert_eq!(decoded.expiry_epoch_seconds, Some(1_700_000_000));
        assert_eq!(decoded.expiry_epoch_millis, Some(1_700_000_000_900));

        let before = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
        assert!(!is_expired(&decoded, before));

        let at = Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap();
        assert!(is_expired(&decoded, at));
        assert_eq!(decoded.expires_at(), Some(at));
    }

    #[test]
    fn absent_expiry_never_expires() {
        let decoded = decode(&token_with_claims(&json!({"sub": "x"}))).unwrap();
        assert!(!is_expired(&decoded, Utc::now() + Duration::days(36500)));
        assert_eq!(decoded.expires_at(), None);
    }

    #[test]
    fn expires_at_converts_seconds() {
        let decoded = decode(&token_with_claims(&json!({"exp": 1_700_000_000}))).unwrap();
        assert_eq!(
            decoded.expires_at(),
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
    }
}
