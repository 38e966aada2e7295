// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role extraction from inconsistent claim shapes.
//!
//! Different backend endpoints have issued tokens with the role in different
//! places: a bare `role` field, a `roles` array of ids or authority strings,
//! or a nested `user` object. Each shape is a [`ClaimStrategy`]; they are
//! tried in [`ROLE_STRATEGIES`] order and the first that recognises a role
//! wins. Nothing recognised means [`Role::Client`].

use serde_json::{Map, Value};

use super::claims::DecodedToken;
use super::roles::Role;

/// One place a role may live in a claim set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStrategy {
    /// `{"role": "ADMIN"}` or `{"role": 1}`
    DirectRole,
    /// `{"roles": [1, "ROLE_ADMIN", {"authority": "ROLE_ADMIN"}]}`
    RolesArray,
    /// `{"user": {"role": ...}}` or `{"user": {"roles": [...]}}`
    NestedUser,
}

/// Order in which strategies are consulted.
pub const ROLE_STRATEGIES: [ClaimStrategy; 3] = [
    ClaimStrategy::DirectRole,
    ClaimStrategy::RolesArray,
    ClaimStrategy::NestedUser,
];

impl ClaimStrategy {
    /// Apply this strategy alone. `None` means "no opinion".
    pub fn extract(&self, claims: &Map<String, Value>) -> Option<Role> {
        match self {
            ClaimStrategy::DirectRole => claims.get("role").and_then(Role::from_claim),
            ClaimStrategy::RolesArray => claims.get("roles").and_then(admin_in_roles),
            ClaimStrategy::NestedUser => {
                let user = claims.get("user")?.as_object()?;
                ClaimStrategy::DirectRole
                    .extract(user)
                    .or_else(|| ClaimStrategy::RolesArray.extract(user))
            }
        }
    }
}

/// `Some(Admin)` when any entry is an admin indicator. A roles list without
/// one says nothing, so later strategies still get a look.
fn admin_in_roles(roles: &Value) -> Option<Role> {
    let is_admin = match roles {
        Value::Array(entries) => entries.iter().any(|entry| match entry {
            Value::Object(obj) => ["authority", "name", "role"]
                .iter()
                .filter_map(|key| obj.get(*key))
                .any(Role::is_admin_indicator),
            other => Role::is_admin_indicator(other),
        }),
        // A single role where a list was expected
        other => Role::is_admin_indicator(other),
    };

    is_admin.then_some(Role::Admin)
}

/// Role carried by a raw claim map.
pub fn extract_role_from(claims: &Map<String, Value>) -> Role {
    ROLE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.extract(claims))
        .unwrap_or(Role::Client)
}

/// Role carried by a decoded token.
pub fn extract_role(decoded: &DecodedToken) -> Role {
    extract_role_from(&decoded.claims)
}
