// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tolerant field lookup over backend JSON.
//!
//! The backend has renamed fields more than once (and misspelled a few), so
//! every view-model field and every sign-in response is read from a list of
//! candidate keys. A key starting with `/` is a JSON pointer into nested
//! objects.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Wrapper keys a collection may be nested under.
const COLLECTION_WRAPPERS: [&str; 4] = ["data", "content", "items", "results"];

/// First present, non-null value among `keys`.
pub fn first_value<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| {
            if key.starts_with('/') {
                record.pointer(key)
            } else {
                record.get(*key)
            }
        })
        .find(|value| !value.is_null())
}

/// First value among `keys` as a string. Numbers are stringified.
pub fn first_str(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match first_value(record, &[*key])? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First value among `keys` as a non-blank, trimmed string.
pub fn first_text(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        first_str(record, &[*key])
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// First value among `keys` as an integer. Numeric strings are accepted.
pub fn first_i64(record: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .find_map(|key| first_value(record, &[*key]).and_then(value_as_i64))
}

/// First value among `keys` as a float. Numeric strings are accepted.
pub fn first_f64(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match first_value(record, &[*key])? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// First value among `keys` as a boolean.
///
/// Accepts JSON booleans, `0`/`1`, and the strings the backend has used for
/// availability flags.
pub fn first_bool(record: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| match first_value(record, &[*key])? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "available" | "disponible" => Some(true),
            "false" | "0" | "no" | "unavailable" | "indisponible" | "rented" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// First value among `keys` as a timestamp.
///
/// Accepts RFC 3339, ISO local date-times (with or without seconds or
/// fraction) and bare dates (midnight).
pub fn first_datetime(record: &Value, keys: &[&str]) -> Option<NaiveDateTime> {
    keys.iter()
        .find_map(|key| first_str(record, &[*key]).and_then(|raw| parse_datetime(&raw)))
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Records of a collection response: a bare array, or an array under one of
/// the usual wrapper keys or any of `extra_wrappers`.
pub fn collection(body: &Value, extra_wrappers: &[&str]) -> Vec<Value> {
    if let Value::Array(items) = body {
        return items.clone();
    }
    for key in COLLECTION_WRAPPERS.iter().copied().chain(extra_wrappers.iter().copied()) {
        if let Some(items) = body.get(key).and_then(Value::as_array) {
            return items.clone();
        }
    }
    Vec::new()
}

/// Unwrap a single-record response that may be nested under `data` or one
/// of `wrappers`.
pub fn single<'a>(body: &'a Value, wrappers: &[&str]) -> &'a Value {
    for key in std::iter::once("data").chain(wrappers.iter().copied()) {
        if let Some(inner) = body.get(key).filter(|v| v.is_object()) {
            return inner;
        }
    }
    body
}

/// Integer value of a JSON number or numeric string.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_f64_as_i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `float` as an integer when it is whole and inside the `i64` range.
pub fn whole_f64_as_i64(float: f64) -> Option<i64> {
    // i64::MAX is not representable; 2^63 is the first float past it
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (float.is_finite() && float.fract() == 0.0 && (-LIMIT..LIMIT).contains(&float))
        .then_some(float as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_value_tries_keys_in_order() {
        let record = json!({"pickUpAdress": "Airport", "pickupAdress": null});
        assert_eq!(
            first_str(&record, &["pickupAdress", "pickUpAdress"]).as_deref(),
            Some("Airport")
        );
        assert_eq!(first_str(&record, &["dropoffAdress"]), None);
    }

    #[test]
    fn pointer_keys_reach_nested_values() {
        let record = json!({"car": {"brand": "Dacia"}});
        assert_eq!(first_str(&record, &["/car/brand"]).as_deref(), Some("Dacia"));
    }

    #[test]
    fn first_text_skips_blank_strings() {
        let record = json!({"a": "  ", "b": "value"});
        assert_eq!(first_text(&record, &["a", "b"]).as_deref(), Some("value"));
        assert_eq!(first_str(&record, &["a", "b"]).as_deref(), Some("  "));
    }

    #[test]
    fn numeric_coercions() {
        let record = json!({"id": "12", "price": "49.5", "seats": 5.0});
        assert_eq!(first_i64(&record, &["id"]), Some(12));
        assert_eq!(first_f64(&record, &["price"]), Some(49.5));
        assert_eq!(first_i64(&record, &["seats"]), Some(5));
    }

    #[test]
    fn bool_coercions() {
        let record = json!({"a": "AVAILABLE", "b": 0, "c": "rented", "d": "maybe"});
        assert_eq!(first_bool(&record, &["a"]), Some(true));
        assert_eq!(first_bool(&record, &["b"]), Some(false));
        assert_eq!(first_bool(&record, &["c"]), Some(false));
        assert_eq!(first_bool(&record, &["d"]), None);
    }

    #[test]
    fn out_of_range_floats_are_not_integers() {
        assert_eq!(whole_f64_as_i64(1e300), None);
        assert_eq!(whole_f64_as_i64(-1e19), None);
        assert_eq!(whole_f64_as_i64(f64::NAN), None);
        assert_eq!(whole_f64_as_i64(-42.0), Some(-42));
        assert_eq!(first_i64(&json!({"id": 1e300}), &["id"]), None);
    }

    #[test]
    fn datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 7, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2026-07-01T10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2026-07-01T10:30"), Some(expected));
        assert_eq!(parse_datetime("2026-07-01T10:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2026-07-01T12:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_datetime("2026-07-01"),
            NaiveDate::from_ymd_opt(2026, 7, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_datetime("July 1st"), None);
    }

    #[test]
    fn collection_shapes() {
        assert_eq!(collection(&json!([1, 2]), &[]).len(), 2);
        assert_eq!(collection(&json!({"data": [1]}), &[]).len(), 1);
        assert_eq!(collection(&json!({"content": [1, 2, 3]}), &[]).len(), 3);
        assert_eq!(collection(&json!({"cars": [1]}), &["cars"]).len(), 1);
        assert!(collection(&json!({"message": "none"}), &[]).is_empty());
    }

    #[test]
    fn single_unwraps_data() {
        let body = json!({"data": {"id": 3}});
        assert_eq!(single(&body, &[]), &json!({"id": 3}));
        let bare = json!({"id": 4});
        assert_eq!(single(&bare, &["car"]), &bare);
    }
}
