// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential store: the single owner of the persisted session.

use std::sync::Arc;

use tracing::debug;

use super::backend::{KeyValueStore, MemoryStore, StorageResult};
use crate::auth::{HeaderFormat, Role, Session};

/// Storage key for the raw bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key for the user id.
pub const USER_ID_KEY: &str = "userId";
/// Storage key for the user role.
pub const USER_ROLE_KEY: &str = "userRole";
/// Storage key for the email address.
pub const EMAIL_KEY: &str = "email";
/// Storage key for the header format that last worked.
pub const HEADER_FORMAT_KEY: &str = "authHeaderFormat";

const SESSION_KEYS: [&str; 5] = [
    TOKEN_KEY,
    USER_ID_KEY,
    USER_ROLE_KEY,
    EMAIL_KEY,
    HEADER_FORMAT_KEY,
];

/// Reads and writes the [`Session`] through a [`KeyValueStore`].
///
/// Cheap to clone; clones share the same backend, so there is exactly one
/// session slot per backend.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store backed by process memory (tests, ephemeral tools).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Write every present field of `session`. Absent fields are left as
    /// they are; present ones overwrite.
    pub fn save(&self, session: &Session) -> StorageResult<()> {
        if let Some(token) = &session.bearer_token {
            self.backend.set(TOKEN_KEY, token)?;
        }
        if let Some(user_id) = &session.user_id {
            self.backend.set(USER_ID_KEY, user_id)?;
        }
        if let Some(role) = session.user_role {
            self.backend.set(USER_ROLE_KEY, role.as_str())?;
        }
        if let Some(email) = &session.email {
            self.backend.set(EMAIL_KEY, email)?;
        }
        if let Some(format) = session.chosen_header_format {
            self.backend.set(HEADER_FORMAT_KEY, format.as_str())?;
        }
        debug!(
            user_id = ?session.user_id,
            role = ?session.user_role,
            "Session saved"
        );
        Ok(())
    }

    /// Read the current session.
    pub fn load(&self) -> StorageResult<Session> {
        let user_role = self.backend.get(USER_ROLE_KEY)?.and_then(|raw| {
            let role = Role::from_str(&raw);
            if role.is_none() {
                debug!(raw_role = %raw, "Ignoring unrecognised stored role");
            }
            role
        });
        let chosen_header_format = self
            .backend
            .get(HEADER_FORMAT_KEY)?
            .and_then(|raw| HeaderFormat::parse(&raw));

        Ok(Session {
            bearer_token: self.backend.get(TOKEN_KEY)?,
            user_id: self.backend.get(USER_ID_KEY)?,
            user_role,
            email: self.backend.get(EMAIL_KEY)?,
            chosen_header_format,
        })
    }

    /// The raw bearer token, if present and non-empty.
    pub fn token(&self) -> StorageResult<Option<String>> {
        Ok(self
            .backend
            .get(TOKEN_KEY)?
            .filter(|token| !token.is_empty()))
    }

    /// Header format that last worked, if any.
    pub fn chosen_format(&self) -> StorageResult<Option<HeaderFormat>> {
        Ok(self
            .backend
            .get(HEADER_FORMAT_KEY)?
            .and_then(|raw| HeaderFormat::parse(&raw)))
    }

    /// Remember which header format the backend accepted.
    pub fn set_chosen_format(&self, format: HeaderFormat) -> StorageResult<()> {
        self.backend.set(HEADER_FORMAT_KEY, format.as_str())
    }

    /// Remove every session key (sign-out, hard expiry).
    pub fn clear(&self) -> StorageResult<()> {
        for key in SESSION_KEYS {
            self.backend.remove(key)?;
        }
        debug!("Session cleared");
        Ok(())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
