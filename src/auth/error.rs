// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use crate::storage::StorageError;

/// Authentication error type.
///
/// The first four variants mean "no usable credential": the caller should
/// send the user to the sign-in screen.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in the credential store
    #[error("No credential present, sign-in required")]
    MissingToken,

    /// Token is not three dot-separated segments
    #[error("Token is malformed")]
    MalformedToken,

    /// Token payload is not base64url-encoded JSON
    #[error("Token payload could not be decoded: {0}")]
    PayloadDecode(String),

    /// Token decoded fine but is past its expiry
    #[error("Token has expired")]
    TokenExpired,

    /// Backend refused the credentials
    #[error("Sign-in rejected: {0}")]
    LoginRejected(String),

    /// Backend answered 2xx but without a usable body
    #[error("Auth response was invalid: {0}")]
    InvalidResponse(String),

    /// Network or transport failure
    #[error("Auth request failed: {0}")]
    Request(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::PayloadDecode(_) => "payload_decode",
            AuthError::TokenExpired => "token_expired",
            AuthError::LoginRejected(_) => "login_rejected",
            AuthError::InvalidResponse(_) => "invalid_response",
            AuthError::Request(_) => "request_failed",
            AuthError::Storage(e) => e.error_code(),
        }
    }

    /// Whether the user has to sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::MalformedToken
                | AuthError::PayloadDecode(_)
                | AuthError::TokenExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_require_login() {
        assert!(AuthError::MissingToken.requires_login());
        assert!(AuthError::MalformedToken.requires_login());
        assert!(AuthError::PayloadDecode("bad".into()).requires_login());
        assert!(AuthError::TokenExpired.requires_login());
        assert!(!AuthError::Request("timeout".into()).requires_login());
        assert!(!AuthError::LoginRejected("nope".into()).requires_login());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AuthError::MissingToken.error_code(), "missing_token");
        assert_eq!(AuthError::TokenExpired.error_code(), "token_expired");
        assert_eq!(
            AuthError::Storage(StorageError::Poisoned).error_code(),
            "storage_poisoned"
        );
    }
}
