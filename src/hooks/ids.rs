// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identifier coercion for hook operations.

use super::error::HookError;
use crate::json::whole_f64_as_i64;

/// Coerce a caller-supplied identifier to a number.
///
/// Integers and whole-valued decimals (`"12.0"`) are accepted; anything
/// fractional, non-numeric or outside the `i64` range is `InvalidId`.
pub fn coerce_id(raw: impl std::fmt::Display) -> Result<i64, HookError> {
    let text = raw.to_string();
    let trimmed = text.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return Ok(id);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(whole_f64_as_i64)
        .ok_or(HookError::InvalidId(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_id("42").unwrap(), 42);
        assert_eq!(coerce_id(7).unwrap(), 7);
        assert_eq!(coerce_id(" 9 ").unwrap(), 9);
        assert_eq!(coerce_id("12.0").unwrap(), 12);
        assert!(matches!(coerce_id("abc"), Err(HookError::InvalidId(_))));
        assert!(matches!(coerce_id("1.5"), Err(HookError::InvalidId(_))));
        assert!(matches!(coerce_id(""), Err(HookError::InvalidId(_))));
    }

    #[test]
    fn coerce_id_rejects_values_outside_i64() {
        assert!(matches!(coerce_id("1e300"), Err(HookError::InvalidId(s)) if s == "1e300"));
        assert!(matches!(coerce_id("-1e19"), Err(HookError::InvalidId(_))));
        assert!(matches!(coerce_id("inf"), Err(HookError::InvalidId(_))));
        assert!(matches!(coerce_id("NaN"), Err(HookError::InvalidId(_))));
        assert_eq!(coerce_id("1e3").unwrap(), 1000);
    }
}
