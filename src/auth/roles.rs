// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles as seen by the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of the signed-in user.
///
/// Advisory only: the backend is the authority on what a user may do. The
/// client uses the role to pick which screens to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Fleet, client and reservation administration
    Admin,
    /// Regular renter
    #[default]
    Client,
}

/// String forms the backend uses for the admin role.
const ADMIN_STRINGS: [&str; 3] = ["1", "ROLE_ADMIN", "ADMIN"];

/// String forms the backend uses for the client role.
const CLIENT_STRINGS: [&str; 5] = ["0", "ROLE_CLIENT", "CLIENT", "ROLE_USER", "USER"];

impl Role {
    /// Parse a stored or claimed role string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        let s = s.trim();
        if ADMIN_STRINGS.iter().any(|a| a.eq_ignore_ascii_case(s)) {
            Some(Role::Admin)
        } else if CLIENT_STRINGS.iter().any(|c| c.eq_ignore_ascii_case(s)) {
            Some(Role::Client)
        } else {
            None
        }
    }

    /// Interpret a single JSON claim value as a role.
    ///
    /// Numbers follow the backend's numeric ids (`1` admin, `0` client).
    pub fn from_claim(value: &Value) -> Option<Role> {
        match value {
            Value::String(s) => Role::from_str(s),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(Role::Admin),
                Some(0) => Some(Role::Client),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether a claim value is one of the admin indicators:
    /// `1`, `"1"`, `"ROLE_ADMIN"` or `"ADMIN"`.
    pub fn is_admin_indicator(value: &Value) -> bool {
        Role::from_claim(value) == Some(Role::Admin)
    }

    /// Value written to persistent storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Client => "CLIENT",
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
