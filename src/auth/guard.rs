// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route guard: who is signed in right now, if anyone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::claims;
use super::error::AuthError;
use super::roles::Role;
use crate::storage::CredentialStore;

/// The signed-in user, as far as the client can tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// Stored user id, else the token subject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Token expiry, absent when the token carries none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Session checks against the credential store.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    store: CredentialStore,
}

impl SessionGuard {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Resolve the current user at `now`.
    ///
    /// An expired token clears the store before returning
    /// [`AuthError::TokenExpired`]. A token that does not decode is left in
    /// place; the backend gets the final say on it.
    pub fn current_user(&self, now: DateTime<Utc>) -> Result<AuthenticatedUser, AuthError> {
        let session = self.store.load()?;
        let token = session.token().ok_or(AuthError::MissingToken)?;
        let decoded = claims::decode(token)?;

        if decoded.is_expired(now) {
            info!(expired_at = ?decoded.expires_at(), "Stored token expired, clearing session");
            self.store.clear()?;
            return Err(AuthError::TokenExpired);
        }

        let role = session.user_role.unwrap_or_else(|| decoded.role());
        debug!(role = %role, "Session resolved");

        Ok(AuthenticatedUser {
            user_id: session.user_id.clone().or_else(|| decoded.subject.clone()),
            role,
            email: session
                .email
                .clone()
                .or_else(|| decoded.email().map(str::to_string)),
            expires_at: decoded.expires_at(),
        })
    }

    /// Whether the current user is an admin. Any auth failure reads as no.
    pub fn is_admin(&self, now: DateTime<Utc>) -> bool {
        self.current_user(now).is_ok_and(|user| user.is_admin())
    }
}
