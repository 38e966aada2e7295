// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Domain hook errors.
//!
//! None of these are fatal: the caller shows an inline message and the
//! hook's in-memory state is left as it was before the call.

use crate::dispatch::DispatchError;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Identifier could not be read as a number
    #[error("Invalid id: {0:?}")]
    InvalidId(String),

    /// No record with that id in the collection the operation applies to
    #[error("{kind} {id} not found")]
    RecordNotFound { kind: &'static str, id: i64 },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Backend answered 2xx with a body that has no usable record
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl HookError {
    pub fn error_code(&self) -> &'static str {
        match self {
            HookError::InvalidId(_) => "invalid_id",
            HookError::RecordNotFound { .. } => "record_not_found",
            HookError::Dispatch(e) => e.error_code(),
            HookError::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Whether the user has to sign in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, HookError::Dispatch(e) if e.requires_login())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_mentions_not_found() {
        let err = HookError::RecordNotFound {
            kind: "Reservation",
            id: 42,
        };
        assert_eq!(err.to_string(), "Reservation 42 not found");
        assert_eq!(err.error_code(), "record_not_found");
    }

    #[test]
    fn missing_token_requires_login() {
        let err = HookError::from(DispatchError::MissingToken);
        assert!(err.requires_login());
        assert!(!HookError::InvalidId("x".into()).requires_login());
    }
}
