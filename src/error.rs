// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::hooks::HookError;
use crate::storage::StorageError;

/// Any error the client surfaces, for callers that do not care which layer
/// raised it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

impl ClientError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Config(_) => "config",
            ClientError::Storage(e) => e.error_code(),
            ClientError::Auth(e) => e.error_code(),
            ClientError::Dispatch(e) => e.error_code(),
            ClientError::Hook(e) => e.error_code(),
        }
    }

    /// Whether the caller should send the user to the sign-in screen.
    pub fn requires_login(&self) -> bool {
        match self {
            ClientError::Auth(e) => e.requires_login(),
            ClientError::Dispatch(e) => e.requires_login(),
            ClientError::Hook(e) => e.requires_login(),
            ClientError::Config(_) | ClientError::Storage(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_come_from_the_inner_error() {
        let err = ClientError::from(AuthError::TokenExpired);
        assert_eq!(err.error_code(), "token_expired");
        assert!(err.requires_login());

        let err = ClientError::from(HookError::InvalidId("x".into()));
        assert_eq!(err.error_code(), "invalid_id");
        assert!(!err.requires_login());
    }

    #[test]
    fn messages_are_transparent() {
        let err = ClientError::from(DispatchError::MissingToken);
        assert_eq!(err.to_string(), DispatchError::MissingToken.to_string());
        assert_eq!(err.error_code(), "missing_token");
    }
}
